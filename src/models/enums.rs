use serde::{Deserialize, Serialize};

/// Macro to generate a serde enum with its stored text via `as_str` and `Display`
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Stored verbatim in `prescriptions.patient_gender`. The column tolerates
// free text; the form only ever offers these three.
str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_text_matches_form_labels() {
        let labels: Vec<_> = [Gender::Male, Gender::Female, Gender::Other]
            .iter()
            .map(Gender::as_str)
            .collect();
        assert_eq!(labels, ["Male", "Female", "Other"]);
    }

    #[test]
    fn gender_displays_as_stored_text() {
        assert_eq!(Gender::Female.to_string(), "Female");
    }

    #[test]
    fn gender_serializes_as_variant_name() {
        assert_eq!(serde_json::to_string(&Gender::Other).unwrap(), "\"Other\"");
    }
}
