#![forbid(unsafe_code)]

/// A controller filter as given on the command line: names enable, `-name`
/// disables, `*` enables everything not disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerSelection {
    entries: Vec<String>,
}

impl ControllerSelection {
    /// Accepts either a comma-separated string or repeated values.
    pub fn parse<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = values
            .into_iter()
            .flat_map(|value| {
                value
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        let mut explicit = false;
        let mut star = false;
        for entry in &self.entries {
            if let Some(disabled) = entry.strip_prefix('-') {
                if disabled == name {
                    return false;
                }
            } else if entry == "*" {
                star = true;
            } else if entry == name {
                explicit = true;
            }
        }
        explicit || star
    }

    pub fn validate<S: AsRef<str>>(&self, known: &[S]) -> Result<(), UnknownControllerError> {
        for entry in &self.entries {
            if entry == "*" {
                continue;
            }
            let name = entry.strip_prefix('-').unwrap_or(entry);
            if !known.iter().any(|candidate| candidate.as_ref() == name) {
                return Err(UnknownControllerError {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Comma-joined form, as passed to `--controllers`.
    pub fn to_flag(&self) -> String {
        self.entries.join(",")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{name:?} is not in the list of known controllers")]
pub struct UnknownControllerError {
    pub name: String,
}
