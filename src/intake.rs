//! Upload intake: turns raw multipart values into a validated [`Submission`].
//!
//! Nothing here touches the database or the image store. A [`Submission`] can
//! only be obtained through [`SubmissionForm::validate`], so the workflow never
//! sees unchecked input.

use std::borrow::Cow;

use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::entities::{Gender, Occasion};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
pub const MIN_AGE: i32 = 13;
pub const MAX_AGE: i32 = 100;

const AGE_RANGE_MESSAGE: &str = "Ensure this value is between 13 and 100.";

/// Failing image checks attach this as the error's `value` param, so the bytes stay out of it.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased text after the last `.` (the whole name when there is no dot).
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Raw form values as they arrive from the client.
#[derive(Debug, Default, Clone)]
pub struct SubmissionForm {
    pub image: Option<UploadedImage>,
    pub occasion: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct Submission {
    #[validate(custom(function = "validate_image"))]
    image: UploadedImage,
    occasion: Occasion,
    gender: Gender,
    #[validate(range(min = 13, max = 100, message = "Ensure this value is between 13 and 100."))]
    age: i32,
}

impl Submission {
    pub fn image(&self) -> &UploadedImage {
        &self.image
    }

    pub fn occasion(&self) -> Occasion {
        self.occasion
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn age(&self) -> i32 {
        self.age
    }
}

impl SubmissionForm {
    /// Checks every field and reports all problems at once.
    pub fn validate(self) -> Result<Submission, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let image = match self.image {
            Some(image) if image.size() > 0 => Some(image),
            Some(_) => {
                errors.add("image", field_error("empty", "The submitted file is empty."));
                None
            }
            None => {
                errors.add("image", required());
                None
            }
        };
        let occasion = parse_choice::<Occasion>(&mut errors, "occasion", self.occasion);
        let gender = parse_choice::<Gender>(&mut errors, "gender", self.gender);
        let age = parse_age(&mut errors, self.age);

        match (image, occasion, gender, age) {
            (Some(image), Some(occasion), Some(gender), Some(age)) if errors.is_empty() => {
                let submission = Submission {
                    image,
                    occasion,
                    gender,
                    age,
                };
                submission.validate()?;
                Ok(submission)
            }
            (image, _, _, age) => {
                // Report the constraint errors of the fields that did parse as well
                if let Some(image) = image {
                    if let Err(e) = validate_image(&image) {
                        errors.add("image", e);
                    }
                }
                if let Some(age) = age {
                    if !(MIN_AGE..=MAX_AGE).contains(&age) {
                        errors.add("age", field_error("range", AGE_RANGE_MESSAGE));
                    }
                }
                Err(errors)
            }
        }
    }
}

fn validate_image(image: &UploadedImage) -> Result<(), ValidationError> {
    if image.size() > MAX_UPLOAD_BYTES {
        return Err(field_error(
            "file_too_large",
            "Image file too large ( > 10MB )",
        ));
    }

    if !ALLOWED_EXTENSIONS.contains(&image.extension().as_str()) {
        return Err(field_error(
            "unsupported_type",
            "Only JPG, PNG, and WebP images are allowed.",
        ));
    }

    if !infer::is_image(&image.bytes) {
        return Err(field_error(
            "invalid_image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        ));
    }

    Ok(())
}

fn parse_choice<T: std::str::FromStr>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<T> {
    let value = match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            errors.add(field, required());
            return None;
        }
    };

    match value.parse::<T>() {
        Ok(choice) => Some(choice),
        Err(_) => {
            errors.add(
                field,
                field_error(
                    "invalid_choice",
                    format!("Select a valid choice. {value} is not one of the available choices."),
                ),
            );
            None
        }
    }
}

fn parse_age(errors: &mut ValidationErrors, value: Option<String>) -> Option<i32> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => match v.parse::<i32>() {
            Ok(age) => Some(age),
            Err(_) => {
                errors.add("age", field_error("invalid", "Enter a whole number."));
                None
            }
        },
        _ => {
            errors.add("age", required());
            None
        }
    }
}

fn required() -> ValidationError {
    field_error("required", "This field is required.")
}

fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}
