//! XML documents for lifecycle configurations, in the S3 wire layout.
//!
//! Rules are written with repeated `Tag` elements directly inside `And`.
//! Reading accepts the same layout, along with the older top-level rule
//! `Prefix`.
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use std::fmt::Display;
use std::str::FromStr;

use super::StoreError;
use crate::rule::{
    AndOperator, Expiration, LifecycleDate, LifecycleRule, NoncurrentVersionExpiration,
    NoncurrentVersionTransition, RuleFilter, RuleSet, Status, Tag, Transition,
};

/// Namespace of every S3 XML document.
const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Encodes a rule set as a `LifecycleConfiguration` document.
pub fn encode(rules: &RuleSet) -> Result<Vec<u8>, StoreError> {
    let mut encoder = Encoder {
        writer: Writer::new(Vec::new()),
    };

    encoder
        .writer
        .write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), None)))?;

    let root = BytesStart::borrowed_name(b"LifecycleConfiguration")
        .with_attributes(vec![("xmlns", S3_NAMESPACE)]);
    encoder.writer.write_event(Event::Start(root))?;

    for rule in &rules.rules {
        encoder.rule(rule)?;
    }

    encoder.end("LifecycleConfiguration")?;
    Ok(encoder.writer.into_inner())
}

/// Decodes a `LifecycleConfiguration` document into a rule set.
pub fn decode(body: &[u8]) -> Result<RuleSet, StoreError> {
    let root = Node::parse(body)?;
    if root.name != "LifecycleConfiguration" {
        return Err(StoreError::Malformed(format!(
            "unexpected document `{}`",
            root.name
        )));
    }

    root.children("Rule")
        .map(decode_rule)
        .collect::<Result<Vec<_>, _>>()
        .map(RuleSet::new)
}

/// Streaming writer for lifecycle documents.
struct Encoder {
    writer: Writer<Vec<u8>>,
}

impl Encoder {
    fn start(&mut self, name: &str) -> quick_xml::Result<()> {
        let start = BytesStart::borrowed_name(name.as_bytes());
        self.writer.write_event(Event::Start(start)).map(|_| ())
    }

    fn end(&mut self, name: &str) -> quick_xml::Result<()> {
        let end = BytesEnd::borrowed(name.as_bytes());
        self.writer.write_event(Event::End(end)).map(|_| ())
    }

    /// Writes a single element holding an escaped text value.
    fn field<V: Display>(&mut self, name: &str, value: V) -> quick_xml::Result<()> {
        let value = value.to_string();
        self.start(name)?;
        self.writer
            .write_event(Event::Text(BytesText::from_plain_str(&value)))?;
        self.end(name)
    }

    fn optional<V: Display>(&mut self, name: &str, value: Option<V>) -> quick_xml::Result<()> {
        match value {
            Some(value) => self.field(name, value),
            None => Ok(()),
        }
    }

    fn flag(&mut self, name: &str, value: bool) -> quick_xml::Result<()> {
        self.optional(name, Some("true").filter(|_| value))
    }

    fn date(&mut self, value: Option<LifecycleDate>) -> quick_xml::Result<()> {
        self.optional("Date", value.map(|date| date.to_rfc3339()))
    }

    fn tag(&mut self, tag: &Tag) -> quick_xml::Result<()> {
        self.start("Tag")?;
        self.field("Key", &tag.key)?;
        self.field("Value", &tag.value)?;
        self.end("Tag")
    }

    fn rule(&mut self, rule: &LifecycleRule) -> quick_xml::Result<()> {
        self.start("Rule")?;
        self.field("ID", &rule.id)?;
        self.field("Status", rule.status.as_str())?;
        self.filter(&rule.filter)?;

        if let Some(ref expiration) = rule.expiration {
            self.start("Expiration")?;
            self.optional("Days", expiration.days)?;
            self.date(expiration.date)?;
            self.flag(
                "ExpiredObjectDeleteMarker",
                expiration.expired_object_delete_marker,
            )?;
            self.flag(
                "ExpiredObjectAllVersions",
                expiration.expired_object_all_versions,
            )?;
            self.end("Expiration")?;
        }

        if let Some(ref transition) = rule.transition {
            self.start("Transition")?;
            self.optional("Days", transition.days)?;
            self.date(transition.date)?;
            self.field("StorageClass", &transition.storage_class)?;
            self.end("Transition")?;
        }

        if let Some(ref expiration) = rule.noncurrent_version_expiration {
            self.start("NoncurrentVersionExpiration")?;
            self.optional("NoncurrentDays", expiration.noncurrent_days)?;
            self.optional(
                "NewerNoncurrentVersions",
                expiration.newer_noncurrent_versions,
            )?;
            self.end("NoncurrentVersionExpiration")?;
        }

        if let Some(ref transition) = rule.noncurrent_version_transition {
            self.start("NoncurrentVersionTransition")?;
            self.optional("NoncurrentDays", transition.noncurrent_days)?;
            self.field("StorageClass", &transition.storage_class)?;
            self.optional(
                "NewerNoncurrentVersions",
                transition.newer_noncurrent_versions,
            )?;
            self.end("NoncurrentVersionTransition")?;
        }

        self.end("Rule")
    }

    fn filter(&mut self, filter: &RuleFilter) -> quick_xml::Result<()> {
        self.start("Filter")?;
        self.optional("Prefix", filter.prefix.as_ref())?;
        if let Some(ref tag) = filter.tag {
            self.tag(tag)?;
        }
        self.optional("ObjectSizeGreaterThan", filter.object_size_greater_than)?;
        self.optional("ObjectSizeLessThan", filter.object_size_less_than)?;

        if let Some(ref and) = filter.and {
            self.start("And")?;
            self.optional("Prefix", and.prefix.as_ref())?;
            for tag in &and.tags {
                self.tag(tag)?;
            }
            self.optional("ObjectSizeGreaterThan", and.object_size_greater_than)?;
            self.optional("ObjectSizeLessThan", and.object_size_less_than)?;
            self.end("And")?;
        }

        self.end("Filter")
    }
}

/// Minimal element tree, enough to walk a lifecycle document.
#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    /// Parses a document, returning its root element.
    fn parse(body: &[u8]) -> Result<Node, StoreError> {
        let mut reader = Reader::from_reader(body);
        let mut buffer = Vec::new();
        let mut stack = vec![Node::default()];

        reader.trim_text(true);

        loop {
            match reader.read_event(&mut buffer)? {
                Event::Start(ref e) => stack.push(Node::named(e.local_name())),
                Event::Empty(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::named(e.local_name()));
                    }
                }
                Event::Text(ref e) => {
                    let text = e.unescaped()?;
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&text));
                    }
                }
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(unbalanced)?;
                    stack.last_mut().ok_or_else(unbalanced)?.children.push(node);
                }
                Event::Eof => break,
                _ => (),
            }
            buffer.clear();
        }

        // only the document holder should be left
        let document = stack.pop().filter(|_| stack.is_empty()).ok_or_else(unbalanced)?;
        document
            .children
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("empty document".to_string()))
    }

    fn named(name: &[u8]) -> Node {
        Node {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Node::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn text_of(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.as_str())
    }

    fn string(&self, name: &str) -> Option<String> {
        self.text_of(name).map(str::to_string)
    }

    fn number<N: FromStr>(&self, name: &str) -> Result<Option<N>, StoreError> {
        self.text_of(name)
            .map(|text| {
                text.parse()
                    .map_err(|_| StoreError::Malformed(format!("invalid {} `{}`", name, text)))
            })
            .transpose()
    }

    fn date(&self) -> Result<Option<LifecycleDate>, StoreError> {
        self.text_of("Date")
            .map(|text| {
                LifecycleDate::parse(text)
                    .map_err(|_| StoreError::Malformed(format!("invalid date `{}`", text)))
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> bool {
        self.text_of(name)
            .map_or(false, |text| text.eq_ignore_ascii_case("true"))
    }
}

fn unbalanced() -> StoreError {
    StoreError::Malformed("unbalanced elements".to_string())
}

fn decode_rule(node: &Node) -> Result<LifecycleRule, StoreError> {
    let id = node.text_of("ID").unwrap_or_default().to_string();
    let raw = node.text_of("Status").unwrap_or_default();
    let status = Status::parse(raw).ok_or_else(|| {
        StoreError::Malformed(format!("unknown status `{}` for rule `{}`", raw, id))
    })?;

    // older configurations carry the prefix at the top level of the rule
    let filter = match node.child("Filter") {
        Some(filter) => decode_filter(filter)?,
        None => RuleFilter {
            prefix: node.string("Prefix"),
            ..RuleFilter::default()
        },
    };

    let expiration = match node.child("Expiration") {
        Some(expiration) => Some(Expiration {
            days: expiration.number("Days")?,
            date: expiration.date()?,
            expired_object_delete_marker: expiration.flag("ExpiredObjectDeleteMarker"),
            expired_object_all_versions: expiration.flag("ExpiredObjectAllVersions"),
        }),
        None => None,
    };

    let transition = match single(node, "Transition", &id)? {
        Some(transition) => Some(Transition {
            days: transition.number("Days")?,
            date: transition.date()?,
            storage_class: transition.string("StorageClass").unwrap_or_default(),
        }),
        None => None,
    };

    let noncurrent_version_expiration = match node.child("NoncurrentVersionExpiration") {
        Some(expiration) => Some(NoncurrentVersionExpiration {
            noncurrent_days: expiration.number("NoncurrentDays")?,
            newer_noncurrent_versions: expiration.number("NewerNoncurrentVersions")?,
        }),
        None => None,
    };

    let noncurrent_version_transition = match single(node, "NoncurrentVersionTransition", &id)? {
        Some(transition) => Some(NoncurrentVersionTransition {
            noncurrent_days: transition.number("NoncurrentDays")?,
            storage_class: transition.string("StorageClass").unwrap_or_default(),
            newer_noncurrent_versions: transition.number("NewerNoncurrentVersions")?,
        }),
        None => None,
    };

    Ok(LifecycleRule {
        id,
        status,
        filter,
        expiration,
        transition,
        noncurrent_version_expiration,
        noncurrent_version_transition,
    })
}

fn decode_filter(node: &Node) -> Result<RuleFilter, StoreError> {
    let and = match node.child("And") {
        Some(and) => Some(AndOperator {
            prefix: and.string("Prefix"),
            tags: and.children("Tag").map(decode_tag).collect(),
            object_size_greater_than: and.number("ObjectSizeGreaterThan")?,
            object_size_less_than: and.number("ObjectSizeLessThan")?,
        }),
        None => None,
    };

    Ok(RuleFilter {
        prefix: node.string("Prefix"),
        tag: node.child("Tag").map(decode_tag),
        object_size_greater_than: node.number("ObjectSizeGreaterThan")?,
        object_size_less_than: node.number("ObjectSizeLessThan")?,
        and,
    })
}

fn decode_tag(node: &Node) -> Tag {
    Tag {
        key: node.string("Key").unwrap_or_default(),
        value: node.string("Value").unwrap_or_default(),
    }
}

/// Finds an action which a rule may carry at most once.
fn single<'a>(node: &'a Node, name: &'a str, id: &str) -> Result<Option<&'a Node>, StoreError> {
    let mut found = node.children(name);
    match (found.next(), found.next()) {
        (_, Some(_)) => Err(StoreError::Unsupported(format!(
            "more than one {} (rule `{}`)",
            name, id
        ))),
        (first, None) => Ok(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{build_rule, RuleOptions};

    fn tagged() -> LifecycleRule {
        build_rule(&RuleOptions {
            id: Some("r1".into()),
            prefix: Some("logs/".into()),
            tags: Some("a=1&b=2".into()),
            expire_days: Some("90".into()),
            transition_date: Some("2030-01-01".into()),
            transition_tier: Some("glacier".into()),
            noncurrent_expire_days: Some("7".into()),
            noncurrent_expire_newer: Some("3".into()),
            ..RuleOptions::default()
        })
        .unwrap()
    }

    fn encoded(rules: Vec<LifecycleRule>) -> String {
        String::from_utf8(encode(&RuleSet::new(rules)).unwrap()).unwrap()
    }

    #[test]
    fn writing_tags_flat_inside_and() {
        let xml = encoded(vec![tagged()]);

        assert!(xml.contains(
            "<Filter><And><Prefix>logs/</Prefix>\
             <Tag><Key>a</Key><Value>1</Value></Tag>\
             <Tag><Key>b</Key><Value>2</Value></Tag>\
             </And></Filter>"
        ));
        assert!(!xml.contains("<Tag><Tag>"));
        assert!(xml.contains("<Expiration><Days>90</Days></Expiration>"));
        assert!(xml.contains(
            "<Transition><Date>2030-01-01T00:00:00Z</Date>\
             <StorageClass>GLACIER</StorageClass></Transition>"
        ));
        assert!(xml.contains(
            "<NoncurrentVersionExpiration><NoncurrentDays>7</NoncurrentDays>\
             <NewerNoncurrentVersions>3</NewerNoncurrentVersions>\
             </NoncurrentVersionExpiration>"
        ));
    }

    #[test]
    fn writing_bare_prefixes_and_escaping_text() {
        let rule = build_rule(&RuleOptions {
            id: Some("a&b".into()),
            prefix: Some("tmp/".into()),
            expire_days: Some("1".into()),
            expire_delete_marker: true,
            ..RuleOptions::default()
        })
        .unwrap();
        let xml = encoded(vec![rule]);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<LifecycleConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">"));
        assert!(xml.contains("<ID>a&amp;b</ID>"));
        assert!(xml.contains("<Filter><Prefix>tmp/</Prefix></Filter>"));
        assert!(xml.contains("<ExpiredObjectDeleteMarker>true</ExpiredObjectDeleteMarker>"));
    }

    #[test]
    fn reading_written_documents() {
        let rules = RuleSet::new(vec![tagged()]);
        let body = encode(&rules).unwrap();

        assert_eq!(decode(&body).unwrap(), rules);
    }

    #[test]
    fn reading_server_documents() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
            <LifecycleConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
              <Rule>
                <ID>cold</ID>
                <Status>Enabled</Status>
                <Filter>
                  <And>
                    <Prefix>data/</Prefix>
                    <Tag><Key>team</Key><Value>data</Value></Tag>
                    <ObjectSizeGreaterThan>1024</ObjectSizeGreaterThan>
                  </And>
                </Filter>
                <Transition>
                  <Days>45</Days>
                  <StorageClass>WARM</StorageClass>
                </Transition>
              </Rule>
              <Rule>
                <ID>old</ID>
                <Prefix>tmp/</Prefix>
                <Status>Disabled</Status>
                <Expiration><Date>2030-05-04T00:00:00.000Z</Date></Expiration>
              </Rule>
            </LifecycleConfiguration>"#;

        let rules = decode(body).unwrap();
        assert_eq!(rules.rules.len(), 2);

        let cold = &rules.rules[0];
        assert_eq!(cold.prefix(), "data/");
        assert_eq!(cold.tags()[0].key, "team");
        assert_eq!(cold.size_bounds(), (Some(1024), None));
        assert_eq!(cold.transition.as_ref().unwrap().days, Some(45));
        assert_eq!(cold.transition.as_ref().unwrap().storage_class, "WARM");

        let old = &rules.rules[1];
        assert_eq!(old.prefix(), "tmp/");
        assert_eq!(old.status, Status::Disabled);
        assert_eq!(
            old.expiration.as_ref().unwrap().date.unwrap().to_string(),
            "2030-05-04"
        );
    }

    #[test]
    fn reading_self_closing_elements() {
        let body = br#"<LifecycleConfiguration><Rule><ID>all</ID><Status>Enabled</Status>
            <Filter><Prefix/></Filter><Expiration><Days>3</Days></Expiration>
            </Rule></LifecycleConfiguration>"#;

        let rules = decode(body).unwrap();
        assert_eq!(rules.rules[0].filter.prefix.as_deref(), Some(""));
        assert_eq!(rules.rules[0].expiration.as_ref().unwrap().days, Some(3));
    }

    #[test]
    fn rejecting_unreadable_documents() {
        let status = br#"<LifecycleConfiguration><Rule><ID>r1</ID><Status>Paused</Status></Rule></LifecycleConfiguration>"#;
        assert!(matches!(decode(status), Err(StoreError::Malformed(_))));

        let twice = br#"<LifecycleConfiguration><Rule><ID>r1</ID><Status>Enabled</Status>
            <Transition><Days>1</Days><StorageClass>A</StorageClass></Transition>
            <Transition><Days>2</Days><StorageClass>B</StorageClass></Transition>
            </Rule></LifecycleConfiguration>"#;
        assert!(matches!(decode(twice), Err(StoreError::Unsupported(_))));

        assert!(decode(b"<Error><Code>AccessDenied</Code></Error>").is_err());
        assert!(decode(b"").is_err());
    }
}
