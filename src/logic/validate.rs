use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            message,
        }
    }
}

/// Collects field violations so a form can report all of them at once.
#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: Vec<FieldError>,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blank and at most `max_len` characters.
    pub fn required(mut self, field: &str, value: &str, max_len: usize) -> Self {
        if value.trim().is_empty() {
            self.errors
                .push(FieldError::new(field, format!("The {} field is required.", field)));
        } else {
            self = self.max_length(field, value, max_len);
        }
        self
    }

    pub fn optional(self, field: &str, value: Option<&str>, max_len: usize) -> Self {
        match value {
            Some(value) => self.max_length(field, value, max_len),
            None => self,
        }
    }

    fn max_length(mut self, field: &str, value: &str, max_len: usize) -> Self {
        if value.chars().count() > max_len {
            self.errors.push(FieldError::new(
                field,
                format!(
                    "The field {} must be a string with a maximum length of {}.",
                    field, max_len
                ),
            ));
        }
        self
    }

    pub fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}
