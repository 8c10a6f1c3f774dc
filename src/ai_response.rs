// Parsing of the tag-delimited text the narrative model answers with.
use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::character::{AbilityScores, CharacterSheet};
use crate::error::{Error, Result};
use crate::event_log::{CampaignEvent, Music};

static XML_DECLARATION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<\?xml.*?\?>").ok());

/// Which occurrence of a repeated tag a lookup returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precedence {
    /// The first one opened in the document.
    #[default]
    DocumentOrder,
    /// The least nested one, then the first opened among those.
    Shallowest,
}

#[derive(Debug)]
struct Occurrence {
    order: usize,
    depth: usize,
    text: String,
}

/// Inner text of every element in a completion.
#[derive(Debug, Default)]
pub struct TagTree {
    occurrences: HashMap<String, Vec<Occurrence>>,
    precedence: Precedence,
}

impl TagTree {
    /// Strips any XML declaration, wraps the rest in a synthetic root and
    /// parses it. Anything that is not well-formed markup is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let stripped = match XML_DECLARATION.as_ref() {
            Some(declaration) => declaration.replace_all(raw, ""),
            None => Cow::Borrowed(raw),
        };
        let wrapped = format!("<root>{}</root>", stripped.trim());

        Self::parse_wrapped(&wrapped).map_err(|reason| {
            log::error!("Unparsable completion ({}):\n{}", reason, raw);
            Error::InvalidGenerativeResponse(reason)
        })
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    fn parse_wrapped(xml: &str) -> std::result::Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        let mut tree = TagTree::default();
        let mut opened = 0;
        // Open elements with their start order and the text collected so far.
        let mut open: Vec<(String, usize, String)> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    open.push((name, opened, String::new()));
                    opened += 1;
                }
                Ok(Event::End(_)) => {
                    let Some((name, order, text)) = open.pop() else {
                        return Err("unexpected closing tag".to_string());
                    };
                    tree.record(name, order, open.len(), text);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    tree.record(name, opened, open.len(), String::new());
                    opened += 1;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| e.to_string())?;
                    for (_, _, buffer) in open.iter_mut() {
                        buffer.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    for (_, _, buffer) in open.iter_mut() {
                        buffer.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!(
                        "error at position {}: {}",
                        reader.buffer_position(),
                        e
                    ));
                }
                _ => {}
            }
        }

        if let Some((name, _, _)) = open.last() {
            return Err(format!("unclosed element <{}>", name));
        }
        Ok(tree)
    }

    fn record(&mut self, name: String, order: usize, depth: usize, text: String) {
        self.occurrences
            .entry(name)
            .or_default()
            .push(Occurrence { order, depth, text });
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        let occurrences = self.occurrences.get(tag)?;
        let winner = match self.precedence {
            Precedence::DocumentOrder => occurrences.iter().min_by_key(|o| o.order),
            Precedence::Shallowest => occurrences.iter().min_by_key(|o| (o.depth, o.order)),
        };
        winner.map(|o| o.text.as_str())
    }

    pub fn required(&self, tag: &str) -> Result<String> {
        self.get(tag).map(str::to_string).ok_or_else(|| {
            log::error!("Completion is missing the <{}> tag", tag);
            Error::InvalidGenerativeResponse(format!("missing <{}> tag", tag))
        })
    }

    /// A comma separated list. An absent tag is an empty list.
    pub fn list(&self, tag: &str) -> Vec<String> {
        self.get(tag).map(split_list).unwrap_or_default()
    }

    // The tag must be present, but its value is taken leniently: anything
    // unparsable counts as zero.
    fn number(&self, tag: &str) -> Result<i32> {
        Ok(self.required(tag)?.trim().parse().unwrap_or(0))
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.trim()
        .replace(", ", ",")
        .split(',')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds the next event of `campaign_name` from a narrative completion.
/// The skybox URL is left unset.
pub fn parse_campaign_event(campaign_name: &str, raw: &str) -> Result<CampaignEvent> {
    let tree = TagTree::parse(raw)?;

    let mut event = CampaignEvent::new(
        campaign_name,
        tree.required("ROOM_NAME")?,
        tree.required("STORY")?,
        tree.required("DESCRIPTION")?,
        tree.required("MUSIC")?,
    );
    event.characters = tree.list("CHARACTERS");
    event.items = tree.list("ITEMS");
    event.dm = tree.get("DM").map(str::to_string);

    if event.mood().is_none() {
        log::warn!(
            "Unknown music '{}' for '{}', expected one of: {}",
            event.music,
            event.room_name,
            Music::choices()
        );
    }
    Ok(event)
}

/// Reads the sheet the model produced from the character creation prompt.
pub fn parse_character_sheet(raw: &str) -> Result<CharacterSheet> {
    // Inventory entries carry their own <name> and <description>.
    let tree = TagTree::parse(raw)?.with_precedence(Precedence::Shallowest);

    Ok(CharacterSheet {
        name: tree.required("name")?,
        gender: tree.required("gender")?,
        race: tree.required("race")?,
        class: tree.required("class")?,
        description: tree.required("description")?,
        background: tree.required("background")?,
        abilities: AbilityScores {
            strength: tree.number("strength")?,
            dexterity: tree.number("dexterity")?,
            constitution: tree.number("constitution")?,
            intelligence: tree.number("intelligence")?,
            wisdom: tree.number("wisdom")?,
            charisma: tree.number("charisma")?,
        },
        hp: tree.number("hp")?,
        nemesis_name: tree.required("nemesis")?,
        nemesis_description: tree.required("nemesis_description")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_comma_with_optional_space() {
        assert_eq!(split_list(" a, b,c "), vec!["a", "b", "c"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn declaration_is_stripped() {
        let tree = TagTree::parse("<?xml version=\"1.0\"?>\n<A>x</A>").unwrap();
        assert_eq!(tree.get("A"), Some("x"));
    }

    #[test]
    fn precedence_picks_among_repeated_tags() {
        let tree = TagTree::parse("<A><B>nested</B></A><B>top</B>").unwrap();
        assert_eq!(tree.get("B"), Some("nested"));

        let tree = tree.with_precedence(Precedence::Shallowest);
        assert_eq!(tree.get("B"), Some("top"));
    }

    #[test]
    fn unclosed_element_is_rejected() {
        let err = TagTree::parse("<A>x").unwrap_err();
        assert_eq!(err.code(), "InvalidGenerativeResponse");
    }
}
