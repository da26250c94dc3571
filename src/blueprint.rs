use serde::{Deserialize, Serialize};

/// A structural outline for a site: chapters and sections, no prose.
///
/// Content is immutable once `approved` flips to true; regenerating an outline
/// allocates a new identity instead of mutating this one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Blueprint {
    pub id: String,
    pub project_id: String,
    pub chapters: Vec<Chapter>,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub purpose: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub purpose: String,
    /// Advisory content-type hints for the constructor; never enforced downstream.
    #[serde(default)]
    pub expected_content_types: Vec<String>,
}

/// Positional chapter identifier. Stable for the blueprint's lifetime so
/// schema sections can reference chapters by id.
pub fn chapter_id(chapter_index: usize) -> String {
    format!("chapter_{chapter_index}")
}

/// Positional section identifier, scoped by chapter position.
pub fn section_id(chapter_index: usize, section_index: usize) -> String {
    format!("section_{chapter_index}_{section_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_follow_positional_scheme() {
        assert_eq!(chapter_id(0), "chapter_0");
        assert_eq!(chapter_id(11), "chapter_11");
        assert_eq!(section_id(0, 0), "section_0_0");
        assert_eq!(section_id(3, 5), "section_3_5");
    }

    #[test]
    fn blueprint_round_trips_through_json() {
        let blueprint = Blueprint {
            id: "bp-1".to_string(),
            project_id: "p-1".to_string(),
            chapters: vec![Chapter {
                id: chapter_id(0),
                title: "Origins".to_string(),
                purpose: "Where it began".to_string(),
                sections: vec![Section {
                    id: section_id(0, 0),
                    title: "Early days".to_string(),
                    purpose: "Set the scene".to_string(),
                    expected_content_types: vec!["prose".to_string(), "timeline".to_string()],
                }],
            }],
            approved: false,
        };

        let json = serde_json::to_string(&blueprint).unwrap();
        let back: Blueprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blueprint);
    }
}
