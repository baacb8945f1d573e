use serde::{Deserialize, Serialize};

mod store;

pub use store::UserStore;

#[cfg(test)]
mod tests;

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Trimmed, title-cased full name
    pub name: String,
    /// Must satisfy 18 < age < 120
    pub age: i64,
    /// Preferred genres (trimmed, no blanks)
    pub music_preferences: Vec<String>,
}

/// Create/replace payload for a user
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub age: i64,
    #[serde(default)]
    pub music_preferences: Vec<String>,
}

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl UserInput {
    /// Validate and normalise the payload.
    ///
    /// Names are trimmed and title-cased, blank preferences are dropped.
    pub fn normalize(self) -> Result<UserInput, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError {
                field: "name",
                message: "name cannot be empty or whitespace".to_string(),
            });
        }

        if !(18 < self.age && self.age < 120) {
            return Err(ValidationError {
                field: "age",
                message: "User age must be between 18 and 120".to_string(),
            });
        }

        let music_preferences = self
            .music_preferences
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        Ok(UserInput {
            name: title_case(name),
            age: self.age,
            music_preferences,
        })
    }
}

/// "juan  PEREZ" -> "Juan  Perez"
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
