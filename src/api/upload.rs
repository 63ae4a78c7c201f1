//! Multipart form decoding shared by the upload endpoints

use std::collections::HashMap;
use std::str::FromStr;

use axum_extra::extract::Multipart;

use crate::{
    error::{AppError, AppResult},
    services::storage::ImageUpload,
};

/// Text fields and files of a multipart request, keyed by field name
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<ImageUpload>>,
}

impl MultipartForm {
    /// Drain the request body. Parts carrying a file name are treated as files.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.entry(name).or_default().push(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// First non-blank value of a text field
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required<T: FromStr>(&self, name: &str) -> AppResult<T> {
        self.optional(name)?
            .ok_or_else(|| AppError::Validation(format!("{} is required", name)))
    }

    pub fn optional<T: FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| AppError::Validation(format!("Invalid value for {}: {}", name, raw)))
            })
            .transpose()
    }

    /// A list field, sent either as repeated parts or as one JSON array
    pub fn list(&self, name: &str) -> AppResult<Option<Vec<String>>> {
        let Some(values) = self.fields.get(name) else {
            return Ok(None);
        };

        let mut items = Vec::new();
        for value in values {
            let value = value.trim();
            if value.starts_with('[') {
                let parsed: Vec<String> = serde_json::from_str(value)
                    .map_err(|e| AppError::Validation(format!("Invalid list for {}: {}", name, e)))?;
                items.extend(parsed);
            } else if !value.is_empty() {
                items.push(value.to_string());
            }
        }

        Ok(Some(
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ))
    }

    pub fn take_files(&mut self, name: &str) -> Vec<ImageUpload> {
        self.files.remove(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        let mut form = MultipartForm::default();
        for (name, value) in fields {
            form.fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        form
    }

    #[test]
    fn test_typed_fields() {
        let form = form(&[("year", "2022"), ("seats", " "), ("price", "abc")]);
        assert_eq!(form.required::<i32>("year").unwrap(), 2022);
        assert_eq!(form.optional::<i32>("seats").unwrap(), None);
        assert!(matches!(
            form.required::<i32>("seats"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            form.optional::<i32>("price"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_list_accepts_json_or_repeated_parts() {
        let repeated = form(&[("features", "GPS"), ("features", "Bluetooth")]);
        assert_eq!(
            repeated.list("features").unwrap(),
            Some(vec!["GPS".to_string(), "Bluetooth".to_string()])
        );

        let json = form(&[("existingImages", r#"["/uploads/a.png", " "]"#)]);
        assert_eq!(
            json.list("existingImages").unwrap(),
            Some(vec!["/uploads/a.png".to_string()])
        );

        let empty = form(&[("existingImages", "[]")]);
        assert_eq!(empty.list("existingImages").unwrap(), Some(vec![]));
        assert_eq!(empty.list("removedImages").unwrap(), None);
    }
}
