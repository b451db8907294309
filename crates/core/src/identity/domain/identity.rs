use std::fmt;

/// Store-assigned identity key. Strictly increasing, never reused.
pub type IdentityId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Lenient parse of operator input: `m`/`male`, `f`/`female`,
    /// `o`/`other` in any case. Anything else is `Other`.
    pub fn parse(input: &str) -> Gender {
        match input.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            "f" | "female" => Gender::Female,
            _ => Gender::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-supplied details of a person being enrolled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityProfile {
    pub name: String,
    pub gender: Gender,
    pub age: u32,
}

impl IdentityProfile {
    pub fn new(name: impl Into<String>, gender: Gender, age: u32) -> Self {
        Self {
            name: name.into(),
            gender,
            age,
        }
    }

    /// Label shown next to a recognized face, e.g. `Alice (Female, 30)`.
    pub fn display_name(&self) -> String {
        format!("{} ({}, {})", self.name, self.gender, self.age)
    }
}

/// A stored identity together with the sample it was enrolled from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub profile: IdentityProfile,
    pub reference_sample: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("m", Gender::Male)]
    #[case("Male", Gender::Male)]
    #[case(" MALE ", Gender::Male)]
    #[case("f", Gender::Female)]
    #[case("Female", Gender::Female)]
    #[case("o", Gender::Other)]
    #[case("other", Gender::Other)]
    #[case("nonbinary", Gender::Other)]
    fn test_gender_parse(#[case] input: &str, #[case] expected: Gender) {
        assert_eq!(Gender::parse(input), expected);
    }

    #[test]
    fn test_gender_display_round_trips_through_parse() {
        for gender in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(Gender::parse(&gender.to_string()), gender);
        }
    }

    #[test]
    fn test_display_name_format() {
        let profile = IdentityProfile::new("Alice", Gender::Female, 30);
        assert_eq!(profile.display_name(), "Alice (Female, 30)");
    }
}
