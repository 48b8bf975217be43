//! Structural validation and repair of candidate documents.

use crate::model::RootKind;
use crate::parser::xml::{XmlElement, XmlNode};
use crate::rsml::defs::{ATTR_ID, ATTR_LABEL, METADATA, PLANT, POINT, ROOT, SCENE};
use thiserror::Error;

/// Elements every valid candidate holds at least once.
const REQUIRED_ELEMENTS: [&str; 5] = [METADATA, SCENE, PLANT, ROOT, POINT];

/// A reason why a candidate cannot be used as is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralIssue {
    #[error("unreadable candidate - {0}")]
    Unreadable(String),
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
    #[error("lateral root `{0}` attached directly to a plant")]
    LateralUnderPlant(String),
    #[error("primary root `{0}` nested inside another root")]
    PrimaryUnderRoot(String),
}

/// Checks the structure of a candidate document.
///
/// Checks:
/// - At least one `metadata`, `scene`, `plant`, `root` and `point` element
/// - No lateral root directly below a `plant`
/// - No primary root directly below another `root`
///
/// # Returns
/// All issues found; an empty list means the candidate is valid.
pub fn validate(document: &XmlElement) -> Vec<StructuralIssue> {
    let mut issues: Vec<StructuralIssue> = REQUIRED_ELEMENTS.iter()
        .filter(|&&name| document.count_named(name) == 0)
        .map(|&name| StructuralIssue::MissingElement(name))
        .collect();

    let parents = std::iter::once(document).chain(document.descendants());
    for parent in parents.filter(|parent| parent.name() == PLANT || parent.name() == ROOT) {
        for root in parent.children_named(ROOT) {
            let id = root.attribute(ATTR_ID).unwrap_or_default().to_string();
            match (label_kind(root), parent.name()) {
                (RootKind::Lateral, PLANT) => issues.push(StructuralIssue::LateralUnderPlant(id)),
                (RootKind::Primary, ROOT) => issues.push(StructuralIssue::PrimaryUnderRoot(id)),
                _ => {}
            }
        }
    }

    issues
}

/// Whether `issues` consist only of laterals hanging off a plant, the one
/// defect [repair] can fix.
pub fn is_repairable(issues: &[StructuralIssue]) -> bool {
    !issues.is_empty()
        && issues.iter().all(|issue| matches!(issue, StructuralIssue::LateralUnderPlant(_)))
}

/// Moves every lateral root below the single primary root of the document.
///
/// Laterals are appended to the primary's children in document order; a
/// lateral nested in another lateral is moved as well, so all of them end up
/// as direct children of the primary.
///
/// # Returns
/// The repaired document, or `None` unless there is exactly one primary root.
pub fn repair(document: &XmlElement) -> Option<XmlElement> {
    let num_primaries = std::iter::once(document)
        .chain(document.descendants())
        .filter(|element| element.name() == ROOT && label_kind(element) == RootKind::Primary)
        .count();
    if num_primaries != 1 {
        return None;
    }

    let mut repaired = document.clone();
    let mut laterals = Vec::new();
    take_laterals(&mut repaired, &mut laterals);

    let primary = find_primary_mut(&mut repaired)?;
    for lateral in laterals {
        primary.push_child(lateral);
    }

    Some(repaired)
}

fn label_kind(element: &XmlElement) -> RootKind {
    RootKind::from_label(element.attribute(ATTR_LABEL).unwrap_or_default())
}

fn is_lateral(element: &XmlElement) -> bool {
    element.name() == ROOT && label_kind(element) == RootKind::Lateral
}

/// Detaches all lateral root elements below `element` into `taken`, in
/// document order, each stripped of its own nested laterals.
fn take_laterals(element: &mut XmlElement, taken: &mut Vec<XmlElement>) {
    let children = std::mem::take(element.children_mut());
    for node in children {
        match node {
            XmlNode::Element(mut child) if is_lateral(&child) => {
                let position = taken.len();
                taken.push(XmlElement::default());
                take_laterals(&mut child, taken);
                taken[position] = child;
            }
            XmlNode::Element(mut child) => {
                take_laterals(&mut child, taken);
                element.push_child(child);
            }
            text => element.children_mut().push(text),
        }
    }
}

fn find_primary_mut(element: &mut XmlElement) -> Option<&mut XmlElement> {
    if element.name() == ROOT && label_kind(element) == RootKind::Primary {
        return Some(element);
    }

    element.children_mut().iter_mut().find_map(|node| match node {
        XmlNode::Element(child) => find_primary_mut(child),
        XmlNode::Text(_) => None,
    })
}
