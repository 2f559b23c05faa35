use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

/// One entry of a name list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub firstname: String,
    pub lastname: String,
    /// Output path the person's triple is derived from
    pub output: PathBuf,
}

impl Person {
    /// Parses `"firstname lastname"`. Extra words after the second are ignored.
    ///
    /// The output lands next to `output_hint` (its directory), or in the current
    /// directory without one.
    pub fn parse(line: &str, output_hint: Option<&Path>) -> SearchResult<Self> {
        let mut words = line.split_whitespace();
        let (Some(firstname), Some(lastname)) = (words.next(), words.next()) else {
            return Err(SearchError::config_error(format!(
                "Expected 'firstname lastname', got '{}'",
                line.trim()
            )));
        };

        let dir = output_hint
            .and_then(Path::parent)
            .unwrap_or(Path::new(""));
        let output = dir.join(format!("{}{}.txt", firstname, capitalize(lastname)));

        Ok(Self {
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            output,
        })
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Uppercases the first character and lowercases the rest
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Parses a whole name list; blank lines are skipped
pub fn parse_name_list(content: &str, output_hint: Option<&Path>) -> SearchResult<Vec<Person>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            Person::parse(line, output_hint).map_err(|e| match e {
                SearchError::ConfigError(msg) => {
                    SearchError::config_error(format!("Name list line {}: {}", n + 1, msg))
                }
                other => other,
            })
        })
        .collect()
}

/// Reads and parses the name list at `path`
pub fn parse_names(path: &Path, output_hint: Option<&Path>) -> SearchResult<Vec<Person>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SearchError::not_found(path),
        _ => SearchError::file_io(path, e),
    })?;
    let people = parse_name_list(&content, output_hint)?;
    debug!("Read {} names from {}", people.len(), path.display());
    Ok(people)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_person() {
        let person = Person::parse("john smith", Some(Path::new("out/results.txt"))).unwrap();
        assert_eq!(person.firstname, "john");
        assert_eq!(person.lastname, "smith");
        assert_eq!(person.output, PathBuf::from("out/johnSmith.txt"));
        assert_eq!(person.display_name(), "john smith");

        let bare = Person::parse("  jane   DOE  extra", None).unwrap();
        assert_eq!(bare.output, PathBuf::from("janeDoe.txt"));
    }

    #[test]
    fn test_parse_person_rejects_single_name() {
        assert!(matches!(
            Person::parse("madonna", None),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("smith"), "Smith");
        assert_eq!(capitalize("mcDONALD"), "Mcdonald");
        assert_eq!(capitalize("österreich"), "Österreich");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_parse_name_list() {
        let people = parse_name_list("john smith\n\n   \njane doe\n", None).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].firstname, "jane");

        let err = parse_name_list("john smith\ncher\n", None).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_names_from_file() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("names.txt");
        fs::write(&list, "ada lovelace\nalan turing\n").unwrap();

        let people = parse_names(&list, Some(&dir.path().join("x.txt"))).unwrap();
        assert_eq!(people[0].output, dir.path().join("adaLovelace.txt"));
        assert_eq!(people[1].output, dir.path().join("alanTuring.txt"));

        assert!(matches!(
            parse_names(&dir.path().join("missing.txt"), None),
            Err(SearchError::NotFound(_))
        ));
    }
}
