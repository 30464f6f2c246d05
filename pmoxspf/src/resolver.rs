//! Résolution des éléments scalaires d'un parent
//!
//! - [`resolve`] cherche l'enfant dans le namespace canonique, puis en mode
//!   tolérant dans les variantes héritées, dans l'ordre de
//!   [`Mode::accepted_namespaces`]. Le premier enfant trouvé l'emporte.
//! - [`assign`] normalise à l'écriture : les variantes héritées sont
//!   supprimées et seul subsiste, le cas échéant, l'enfant canonique.
//!
//! Les wrappers typés (URI, date) s'appuient sur ces deux fonctions. Un
//! élément absent donne `Ok(None)` ; un contenu illisible donne une erreur
//! portant le nom du champ.

use crate::namespace::{Mode, NamespaceKind, XSPF_NS};
use crate::tree::{ElementData, NodeRef};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use url::Url;

fn is_named(element: &ElementData, local_name: &str, kind: NamespaceKind) -> bool {
    element.name == local_name && NamespaceKind::classify(element.namespace.as_deref()) == Some(kind)
}

/// Premier enfant `local_name` dans les namespaces acceptés par `mode`
pub fn find(parent: &NodeRef, local_name: &str, mode: Mode) -> Option<NodeRef> {
    for &kind in mode.accepted_namespaces() {
        if let Some(child) = parent.find_child(|e| is_named(e, local_name, kind)) {
            if kind != NamespaceKind::Canonical {
                tracing::trace!("<{}> resolved with {:?} namespace", local_name, kind);
            }
            return Some(child);
        }
    }
    None
}

/// Texte de l'enfant `local_name`, ou `None` s'il est absent
pub fn resolve(parent: &NodeRef, local_name: &str, mode: Mode) -> Option<String> {
    find(parent, local_name, mode).map(|child| child.text())
}

/// Écrit (`Some`) ou supprime (`None`) l'enfant `local_name`.
///
/// Quel que soit le mode, les enfants de même nom local en namespace hérité
/// ou sans namespace sont supprimés, ainsi que les doublons canoniques :
/// après l'appel, il existe au plus un enfant de ce nom, canonique.
pub fn assign(parent: &NodeRef, local_name: &str, value: Option<&str>) {
    let stray = parent.child_elements_where(|e| {
        is_named(e, local_name, NamespaceKind::Legacy) || is_named(e, local_name, NamespaceKind::Empty)
    });
    if !stray.is_empty() {
        tracing::debug!(
            "Removing {} non-canonical <{}> element(s)",
            stray.len(),
            local_name
        );
    }
    for node in stray {
        node.detach();
    }

    let mut canonical = parent
        .child_elements_where(|e| is_named(e, local_name, NamespaceKind::Canonical))
        .into_iter();
    let first = canonical.next();
    for duplicate in canonical {
        duplicate.detach();
    }

    match (first, value) {
        (Some(existing), Some(text)) => existing.set_text(text),
        (Some(existing), None) => existing.detach(),
        (None, Some(text)) => {
            let child = parent.tree().create_element(local_name, Some(XSPF_NS));
            child.set_text(text);
            // Même arbre par construction
            if let Err(e) = parent.append(&child) {
                tracing::warn!("Cannot append <{}>: {}", local_name, e);
            }
        }
        (None, None) => {}
    }
}

/// Champ texte
pub fn get_string(parent: &NodeRef, local_name: &str, mode: Mode) -> Option<String> {
    resolve(parent, local_name, mode)
}

pub fn set_string(parent: &NodeRef, local_name: &str, value: Option<&str>) {
    assign(parent, local_name, value)
}

/// Champ URI (URI absolue)
pub fn get_uri(parent: &NodeRef, local_name: &str, mode: Mode) -> Result<Option<Url>> {
    resolve(parent, local_name, mode)
        .map(|text| {
            Url::parse(text.trim()).map_err(|source| Error::NotLegalUri {
                field: local_name.to_string(),
                source,
            })
        })
        .transpose()
}

pub fn set_uri(parent: &NodeRef, local_name: &str, value: Option<&Url>) {
    assign(parent, local_name, value.map(Url::as_str))
}

/// Champ date (`xsd:dateTime`)
pub fn get_date(
    parent: &NodeRef,
    local_name: &str,
    mode: Mode,
) -> Result<Option<DateTime<FixedOffset>>> {
    resolve(parent, local_name, mode)
        .map(|text| {
            parse_date(text.trim()).map_err(|source| Error::NotLegalDate {
                field: local_name.to_string(),
                value: text,
                source,
            })
        })
        .transpose()
}

/// Écrit la date au format RFC 3339, relu à l'identique par [`get_date`]
pub fn set_date(parent: &NodeRef, local_name: &str, value: Option<&DateTime<FixedOffset>>) {
    let text = value.map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    assign(parent, local_name, text.as_deref())
}

/// Accepte RFC 3339, puis une date-heure ou une date sans fuseau (prises en
/// UTC). En cas d'échec, l'erreur RFC 3339 est retournée.
fn parse_date(text: &str) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    let rfc3339_error = match DateTime::parse_from_rfc3339(text) {
        Ok(date) => return Ok(date),
        Err(e) => e,
    };
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
        .map_err(|_| rfc3339_error)
}
