//! Editable state behind the "Customer Behavior Input" form

use crate::error::{DashboardError, Result};
use crate::prediction::PredictionRequest;

pub const SLIDER_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Frequency,
    Monetary,
    Tenure,
    ReturnRate,
    AvgDiscount,
    AvgQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Whole number with a lower bound
    Integer { min: u32 },
    /// Decimal with a lower bound
    Decimal { min: f64 },
    /// Decimal in [0, 1] adjusted in fixed steps
    Slider,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::Frequency,
        FormField::Monetary,
        FormField::Tenure,
        FormField::ReturnRate,
        FormField::AvgDiscount,
        FormField::AvgQuantity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Frequency => "Purchase Frequency",
            FormField::Monetary => "Total Monetary ($)",
            FormField::Tenure => "Tenure (Days)",
            FormField::ReturnRate => "Return Rate (0-1)",
            FormField::AvgDiscount => "Avg. Discount Applied",
            FormField::AvgQuantity => "Avg. Item Quantity",
        }
    }

    /// Field name in the request payload
    pub fn key(&self) -> &'static str {
        match self {
            FormField::Frequency => "frequency",
            FormField::Monetary => "monetary",
            FormField::Tenure => "tenure",
            FormField::ReturnRate => "return_rate",
            FormField::AvgDiscount => "avg_discount",
            FormField::AvgQuantity => "avg_quantity",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FormField::Frequency | FormField::Tenure | FormField::AvgQuantity => {
                FieldKind::Integer { min: 1 }
            }
            FormField::Monetary => FieldKind::Decimal { min: 0.0 },
            FormField::ReturnRate | FormField::AvgDiscount => FieldKind::Slider,
        }
    }

    fn default_text(&self) -> String {
        let defaults = PredictionRequest::default();
        match self {
            FormField::Frequency => defaults.frequency.to_string(),
            FormField::Monetary => format!("{:.2}", defaults.monetary),
            FormField::Tenure => defaults.tenure.to_string(),
            FormField::ReturnRate => format!("{:.2}", defaults.return_rate),
            FormField::AvgDiscount => format!("{:.2}", defaults.avg_discount),
            FormField::AvgQuantity => defaults.avg_quantity.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionForm {
    values: [String; 6],
    focus: usize,
}

impl Default for PredictionForm {
    fn default() -> Self {
        Self {
            values: FormField::ALL.map(|field| field.default_text()),
            focus: 0,
        }
    }
}

impl PredictionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> FormField {
        FormField::ALL[self.focus]
    }

    pub fn value(&self, field: FormField) -> &str {
        &self.values[index_of(field)]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % FormField::ALL.len();
    }

    pub fn focus_previous(&mut self) {
        self.focus = (self.focus + FormField::ALL.len() - 1) % FormField::ALL.len();
    }

    /// Type a character into the focused field; anything but digits and a
    /// single decimal point is ignored
    pub fn insert(&mut self, ch: char) {
        let kind = self.focused().kind();
        let value = &mut self.values[self.focus];
        match ch {
            '0'..='9' => value.push(ch),
            '.' if !matches!(kind, FieldKind::Integer { .. }) && !value.contains('.') => {
                value.push(ch)
            }
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
    }

    /// Move the focused slider by `steps` increments, clamped to [0, 1]
    pub fn adjust(&mut self, steps: i32) {
        if self.focused().kind() != FieldKind::Slider {
            return;
        }
        let value = &mut self.values[self.focus];
        let current: f64 = value.parse().unwrap_or(0.0);
        let next = (current + steps as f64 * SLIDER_STEP).clamp(0.0, 1.0);
        *value = format!("{:.2}", next);
    }

    pub fn reset(&mut self) {
        *self = Self {
            focus: self.focus,
            ..Self::default()
        };
    }

    /// Parse every field and check the bounds the widgets promise
    pub fn to_request(&self) -> Result<PredictionRequest> {
        let request = PredictionRequest {
            frequency: self.integer(FormField::Frequency)?,
            monetary: self.decimal(FormField::Monetary)?,
            tenure: self.integer(FormField::Tenure)?,
            return_rate: self.decimal(FormField::ReturnRate)?,
            avg_discount: self.decimal(FormField::AvgDiscount)?,
            avg_quantity: self.integer(FormField::AvgQuantity)?,
        };
        request.validate()?;
        Ok(request)
    }

    fn integer(&self, field: FormField) -> Result<u32> {
        self.value(field)
            .trim()
            .parse()
            .map_err(|_| DashboardError::invalid(field.key(), "must be a whole number"))
    }

    fn decimal(&self, field: FormField) -> Result<f64> {
        self.value(field)
            .trim()
            .parse()
            .map_err(|_| DashboardError::invalid(field.key(), "must be a number"))
    }
}

fn index_of(field: FormField) -> usize {
    FormField::ALL
        .iter()
        .position(|f| *f == field)
        .unwrap_or_default()
}
