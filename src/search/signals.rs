use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Location,
    Temporal,
    Price,
    Airline,
    Class,
    Comparison,
    Conjunction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detector {
    /// Fires when any keyword occurs as a whole word or phrase. Keywords made
    /// of other characters (e.g. `$`) match as plain substrings.
    Keywords { words: Vec<String> },
    /// Fires on at least `min_or` "or" words, or more than `max_and` "and"
    /// words.
    Connectives { min_or: usize, max_and: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub category: SignalCategory,
    pub detector: Detector,
    pub weight: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    pub signals: Vec<Signal>,
    pub budget_keywords: Vec<String>,
    /// Records priced strictly below this are "budget-friendly".
    pub budget_price_ceiling: f64,
}

#[derive(Clone, Debug)]
pub struct QueryText {
    lower: String,
    padded: String,
}

impl QueryText {
    pub fn new(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let padded = format!(" {} ", words.join(" "));
        Self { lower, padded }
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        if keyword.is_empty() {
            return false;
        }
        if keyword.chars().all(|c| c.is_alphanumeric() || c == ' ') {
            self.padded.contains(&format!(" {keyword} "))
        } else {
            self.lower.contains(keyword)
        }
    }

    pub fn count_word(&self, word: &str) -> usize {
        self.padded.split(' ').filter(|w| *w == word).count()
    }
}

impl Signal {
    pub fn fires(&self, q: &QueryText) -> bool {
        match &self.detector {
            Detector::Keywords { words } => words.iter().any(|w| q.has_keyword(w)),
            Detector::Connectives { min_or, max_and } => {
                q.count_word("or") >= *min_or || q.count_word("and") > *max_and
            }
        }
    }
}

impl SignalTable {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let table: Self = serde_yaml::from_str(yaml)?;
        Ok(table.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read signal table {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("parse signal table {}", path.display()))
    }

    fn normalized(mut self) -> Self {
        for signal in &mut self.signals {
            if let Detector::Keywords { words } = &mut signal.detector {
                words.iter_mut().for_each(|w| *w = w.trim().to_lowercase());
            }
        }
        self.budget_keywords
            .iter_mut()
            .for_each(|w| *w = w.trim().to_lowercase());
        self
    }

    pub fn detect(&self, q: &QueryText) -> Vec<SignalCategory> {
        self.signals
            .iter()
            .filter(|s| s.fires(q))
            .map(|s| s.category)
            .collect()
    }

    pub fn score(&self, q: &QueryText) -> u32 {
        self.signals
            .iter()
            .filter(|s| s.fires(q))
            .map(|s| s.weight)
            .sum()
    }

    pub fn is_budget_query(&self, q: &QueryText) -> bool {
        self.budget_keywords.iter().any(|w| q.has_keyword(w))
    }
}

fn words(list: &[&str]) -> Detector {
    Detector::Keywords {
        words: list.iter().map(|w| w.to_string()).collect(),
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self {
            signals: vec![
                Signal {
                    category: SignalCategory::Location,
                    detector: words(&["from", "to", "between", "via"]),
                    weight: 1,
                },
                Signal {
                    category: SignalCategory::Temporal,
                    detector: words(&["tomorrow", "today", "weekend", "morning", "evening", "date"]),
                    weight: 1,
                },
                Signal {
                    category: SignalCategory::Price,
                    detector: words(&["cheap", "under", "budget", "expensive", "price", "$"]),
                    weight: 1,
                },
                Signal {
                    category: SignalCategory::Airline,
                    detector: words(&[
                        "airline",
                        "airlines",
                        "american",
                        "delta",
                        "united",
                        "southwest",
                        "jetblue",
                        "alaska",
                        "spirit",
                        "frontier",
                        "hawaiian",
                        "air france",
                        "british airways",
                        "lufthansa",
                        "emirates",
                        "klm",
                        "qatar",
                    ]),
                    weight: 1,
                },
                Signal {
                    category: SignalCategory::Class,
                    detector: words(&["business", "first", "economy", "class"]),
                    weight: 1,
                },
                Signal {
                    category: SignalCategory::Comparison,
                    detector: words(&["compare", "vs", "versus", "better", "best", "worst"]),
                    weight: 2,
                },
                Signal {
                    category: SignalCategory::Conjunction,
                    detector: Detector::Connectives {
                        min_or: 1,
                        max_and: 1,
                    },
                    weight: 2,
                },
            ],
            budget_keywords: vec!["cheap".into(), "budget".into(), "under".into()],
            budget_price_ceiling: 500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_whole_words_only() {
        let q = QueryText::new("Flights to Tokyo");
        assert!(q.has_keyword("to"));
        let q = QueryText::new("Tokyo tomorrow");
        assert!(!q.has_keyword("to"));
        assert!(q.has_keyword("tomorrow"));
    }

    #[test]
    fn symbol_keywords_match_as_substrings() {
        let q = QueryText::new("anything under $300?");
        assert!(q.has_keyword("$"));
        assert!(q.has_keyword("under"));
    }

    #[test]
    fn phrases_match_across_punctuation() {
        let q = QueryText::new("Is British-Airways any good");
        assert!(q.has_keyword("british airways"));
    }

    #[test]
    fn connectives_need_one_or_or_two_ands() {
        let t = SignalTable::default();
        let has_conj =
            |s: &str| t.detect(&QueryText::new(s)).contains(&SignalCategory::Conjunction);
        assert!(has_conj("boston or miami"));
        assert!(!has_conj("boston and miami"));
        assert!(has_conj("boston and miami and denver"));
        assert!(!has_conj("oregon anderson"));
    }

    #[test]
    fn comparison_weighs_double() {
        let t = SignalTable::default();
        assert_eq!(t.score(&QueryText::new("compare these")), 2);
        assert_eq!(t.score(&QueryText::new("hello")), 0);
    }

    #[test]
    fn yaml_table_is_normalized() {
        let yaml = r#"
signals:
  - category: price
    detector:
      kind: keywords
      words: ["  CHEAP "]
    weight: 3
budget_keywords: ["Cheap"]
budget_price_ceiling: 250.0
"#;
        let t = SignalTable::from_yaml_str(yaml).unwrap();
        assert_eq!(t.score(&QueryText::new("cheap seats")), 3);
        assert!(t.is_budget_query(&QueryText::new("CHEAP")));
        assert_eq!(t.budget_price_ceiling, 250.0);
    }
}
