//! Role classification
//!
//! Picks the main system first, then assigns every other element a role from
//! its visual hints and its position relative to the main system. This is
//! the only place where [`VisualHints`](crate::core::VisualHints) are
//! interpreted.
//!
//! Main-system candidates, in order of precedence:
//! 1. elements matching the caller's hint (id or label, case-insensitive)
//! 2. elements declaring `c4Role=main-system`
//! 3. elements sharing the largest box area
//! 4. when every box has the same area, elements sharing the highest degree
//!
//! One candidate is taken as is. Several candidates go to the
//! [`SelectionProvider`] in interactive mode, otherwise the first in document
//! order wins (or [`C4Error::AmbiguousMainSystem`] in strict mode).

use std::collections::HashSet;
use tracing::{debug, info, span, trace, warn, Level};

use crate::core::{C4Error, Diagram, Element, Result, Role, SelectionMode};

/// One main-system candidate as shown to a [`SelectionProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub label: String,
    pub area: f64,
    pub degree: usize,
}

/// Chooses the main system among several candidates
///
/// Candidates arrive in document order; the returned value is an index into
/// that slice.
pub trait SelectionProvider {
    fn select(&mut self, candidates: &[Candidate]) -> Result<usize>;
}

/// Always picks the first candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl SelectionProvider for FirstCandidate {
    fn select(&mut self, _candidates: &[Candidate]) -> Result<usize> {
        Ok(0)
    }
}

/// What drove the main-system choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Hint,
    Declared,
    Area,
    Degree,
}

/// Result of a classification run
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub main_system: String,
    /// Candidate ids in document order
    pub candidates: Vec<String>,
    pub source: CandidateSource,
}

/// Assigns C4 roles to the elements of a diagram
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    mode: SelectionMode,
    main_system_hint: Option<String>,
    strict: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Element id or label that names the main system
    pub fn with_main_system(mut self, hint: Option<String>) -> Self {
        self.main_system_hint = hint.filter(|h| !h.trim().is_empty());
        self
    }

    /// Refuse to break ties in non-interactive mode
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Classify every element; only `provider` may be consulted for ties
    pub fn classify(
        &self,
        diagram: &mut Diagram,
        provider: &mut dyn SelectionProvider,
    ) -> Result<Classification> {
        let classify_span = span!(
            Level::INFO,
            "classify",
            mode = %self.mode,
            element_count = diagram.elements().len()
        );
        let _enter = classify_span.enter();

        if diagram.is_empty() {
            warn!("Nothing to classify");
            return Err(C4Error::EmptyDiagram);
        }

        let (candidates, source) = self.candidates(diagram)?;
        debug!(count = candidates.len(), ?source, "Main-system candidates");
        let main_id = self.choose(&candidates, provider)?;
        info!(main_system = %main_id, ?source, "Main system selected");

        let neighbors: HashSet<String> = diagram
            .neighbors(&main_id)
            .into_iter()
            .map(str::to_string)
            .collect();
        let main_cluster = diagram
            .element(&main_id)
            .and_then(|e| e.hints.cluster.clone());

        for element in diagram.elements_mut() {
            element.role = if element.id == main_id {
                Role::MainSystem
            } else {
                infer_role(element, &neighbors, main_cluster.as_deref())
            };
            trace!(element_id = %element.id, role = %element.role, "Classified element");
        }

        Ok(Classification {
            main_system: main_id,
            candidates: candidates.into_iter().map(|c| c.id).collect(),
            source,
        })
    }

    fn candidates(&self, diagram: &Diagram) -> Result<(Vec<Candidate>, CandidateSource)> {
        let to_candidate = |e: &Element| Candidate {
            id: e.id.clone(),
            label: e.label.clone(),
            area: e.area(),
            degree: diagram.degree(&e.id),
        };
        let elements = diagram.elements();

        if let Some(hint) = &self.main_system_hint {
            let hint = hint.trim();
            let matches: Vec<Candidate> = elements
                .iter()
                .filter(|e| {
                    e.id == hint
                        || e.label.eq_ignore_ascii_case(hint)
                        || e.label
                            .lines()
                            .next()
                            .is_some_and(|first| first.trim().eq_ignore_ascii_case(hint))
                })
                .map(to_candidate)
                .collect();
            if matches.is_empty() {
                return Err(C4Error::selection_error(format!(
                    "no element matches main system '{}'",
                    hint
                )));
            }
            return Ok((matches, CandidateSource::Hint));
        }

        let declared: Vec<Candidate> = elements
            .iter()
            .filter(|e| e.hints.declared_role == Some(Role::MainSystem))
            .map(to_candidate)
            .collect();
        if !declared.is_empty() {
            return Ok((declared, CandidateSource::Declared));
        }

        let max_area = elements.iter().map(Element::area).fold(f64::MIN, f64::max);
        let largest: Vec<Candidate> = elements
            .iter()
            .filter(|e| e.area() == max_area)
            .map(to_candidate)
            .collect();
        if largest.len() < elements.len() || largest.len() == 1 {
            return Ok((largest, CandidateSource::Area));
        }

        // every box has the same size: fall back to connectivity
        let max_degree = largest.iter().map(|c| c.degree).max().unwrap_or(0);
        let busiest = largest
            .into_iter()
            .filter(|c| c.degree == max_degree)
            .collect();
        Ok((busiest, CandidateSource::Degree))
    }

    fn choose(
        &self,
        candidates: &[Candidate],
        provider: &mut dyn SelectionProvider,
    ) -> Result<String> {
        match candidates {
            [] => Err(C4Error::EmptyDiagram),
            [only] => Ok(only.id.clone()),
            _ => match self.mode {
                SelectionMode::Interactive => {
                    let index = provider.select(candidates)?;
                    candidates.get(index).map(|c| c.id.clone()).ok_or_else(|| {
                        C4Error::selection_error(format!(
                            "selection {} is out of range for {} candidates",
                            index,
                            candidates.len()
                        ))
                    })
                }
                SelectionMode::NonInteractive if self.strict => {
                    Err(C4Error::AmbiguousMainSystem {
                        candidates: candidates.iter().map(|c| c.id.clone()).collect(),
                    })
                }
                // candidates are collected in document order
                SelectionMode::NonInteractive => Ok(candidates[0].id.clone()),
            },
        }
    }
}

/// Classify a diagram with default options
pub fn classify(
    diagram: &mut Diagram,
    mode: SelectionMode,
    provider: &mut dyn SelectionProvider,
) -> Result<Classification> {
    Classifier::new().with_mode(mode).classify(diagram, provider)
}

fn contains_any(value: Option<&str>, needles: &[&str]) -> bool {
    value.is_some_and(|v| {
        let v = v.to_lowercase();
        needles.iter().any(|n| v.contains(n))
    })
}

fn is_actor(element: &Element) -> bool {
    let hints = &element.hints;
    contains_any(hints.shape.as_deref(), &["umlactor", "actor", "person"])
        || contains_any(hints.icon.as_deref(), &["person", "user", "actor"])
        || contains_any(hints.kind.as_deref(), &["person", "actor", "user"])
}

fn mentions_database(label: &str) -> bool {
    label
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .any(|word| {
            matches!(word.as_str(), "db" | "database" | "datastore")
                || (word.len() > 2 && word.ends_with("db"))
        })
}

fn is_persistence(element: &Element) -> bool {
    let hints = &element.hints;
    contains_any(hints.shape.as_deref(), &["cylinder", "datastore", "database"])
        || contains_any(
            hints.icon.as_deref(),
            &["database", "datastore", "storage", "sql", "dynamodb"],
        )
        || contains_any(hints.kind.as_deref(), &["database", "cylinder", "datastore"])
        || mentions_database(&element.label)
}

fn infer_role(
    element: &Element,
    neighbors: &HashSet<String>,
    main_cluster: Option<&str>,
) -> Role {
    let hints = &element.hints;

    if let Some(declared) = hints
        .declared_role
        .filter(|r| r.is_classified() && *r != Role::MainSystem)
    {
        return declared;
    }
    let adjacent = neighbors.contains(&element.id);
    if is_actor(element) && adjacent {
        return Role::Person;
    }
    if is_persistence(element) {
        return Role::Database;
    }
    if contains_any(hints.kind.as_deref(), &["component"]) {
        return Role::Component;
    }
    if contains_any(hints.shape.as_deref(), &["cloud"])
        || contains_any(hints.kind.as_deref(), &["cloud", "external"])
    {
        return Role::ExternalSystem;
    }
    if hints.cluster.is_some() && hints.cluster.as_deref() != main_cluster {
        return Role::ExternalSystem;
    }
    if !adjacent {
        return Role::ExternalSystem;
    }
    Role::Container
}
