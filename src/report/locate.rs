use regex::Regex;
use tracing::{debug, warn};

use crate::config::ImportConfig;
use crate::error::{Field, ImportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFields {
    pub group_code: String,
    pub subject_name: String,
}

pub fn locate_fields(text: &str, cfg: &ImportConfig) -> Result<LocatedFields, ImportError> {
    let group_code =
        find_anchored(text, &cfg.group_anchors).ok_or(ImportError::MissingField(Field::Group))?;
    let subject_name = find_anchored(text, &cfg.subject_anchors)
        .ok_or(ImportError::MissingField(Field::Subject))?;
    debug!(group = %group_code, subject = %subject_name, "located report fields");
    Ok(LocatedFields {
        group_code,
        subject_name,
    })
}

/// Returns the trimmed rest of the line after the earliest anchor occurrence.
/// An occurrence with nothing after it on the line is skipped.
pub fn find_anchored(text: &str, anchors: &[String]) -> Option<String> {
    let alternatives: Vec<String> = anchors
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    let pattern = format!(r"(?i)(?:{})[ \t]*([^\r\n]*)", alternatives.join("|"));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "anchor pattern rejected");
            return None;
        }
    };

    let found = re
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| !v.is_empty())
        .map(str::to_string);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_group_and_subject_values() {
        let text = "Рейтинги студентов по дисциплине\nГруппа: CS-101\nДисциплина: Math\n";
        let f = locate_fields(text, &ImportConfig::default()).expect("fields");
        assert_eq!(f.group_code, "CS-101");
        assert_eq!(f.subject_name, "Math");
    }

    #[test]
    fn earliest_group_anchor_wins() {
        let text = "Полный отчёт по группе IT-7\nГруппа: CS-101\nДисциплина: Math";
        let f = locate_fields(text, &ImportConfig::default()).expect("fields");
        assert_eq!(f.group_code, "IT-7");
    }

    #[test]
    fn anchors_match_case_insensitively_and_trim() {
        let text = "ГРУППА:    CS-9   \r\nдисциплина:\tPhysics \r\n";
        let f = locate_fields(text, &ImportConfig::default()).expect("fields");
        assert_eq!(f.group_code, "CS-9");
        assert_eq!(f.subject_name, "Physics");
    }

    #[test]
    fn missing_group_anchor_is_reported() {
        let err = locate_fields("Дисциплина: Math\n1 Ivanov 85", &ImportConfig::default())
            .expect_err("no group");
        assert!(matches!(err, ImportError::MissingField(Field::Group)));
    }

    #[test]
    fn missing_subject_anchor_is_reported() {
        let err = locate_fields("Группа: CS-101\n1 Ivanov 85", &ImportConfig::default())
            .expect_err("no subject");
        assert!(matches!(err, ImportError::MissingField(Field::Subject)));
    }

    #[test]
    fn empty_value_is_skipped_for_a_later_occurrence() {
        let anchors = vec!["Группа:".to_string()];
        assert_eq!(
            find_anchored("Группа:\nГруппа: B-2", &anchors).as_deref(),
            Some("B-2")
        );
        assert_eq!(find_anchored("Группа:   \n", &anchors), None);
    }

    #[test]
    fn anchor_text_is_matched_literally() {
        let anchors = vec!["Group (code):".to_string()];
        assert_eq!(
            find_anchored("Group (code): X1", &anchors).as_deref(),
            Some("X1")
        );
        assert_eq!(find_anchored("Group code: X1", &anchors), None);
    }
}
