use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_value(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Bmi {
    /// Rounded to one decimal place.
    pub value: f64,
    pub category: BmiCategory,
}

/// Body-mass index from weight in kilograms and height in centimetres.
pub fn bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<Bmi> {
    let weight = weight_kg.filter(|w| *w > 0.0)?;
    let height_m = height_cm.filter(|h| *h > 0.0)? / 100.0;

    let value = (weight / (height_m * height_m) * 10.0).round() / 10.0;
    Some(Bmi {
        value,
        category: BmiCategory::from_value(value),
    })
}
