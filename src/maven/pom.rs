//! POM XML parsing
//!
//! Streams the document with quick-xml, tracking the element path and
//! assigning the text of each closed element to the matching
//! [`Descriptor`] field. Unknown elements are ignored.

use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::domain::{DependencyRef, Descriptor, Developer, License, Organization, ParentRef, Scm};

#[derive(Debug, Error, PartialEq)]
pub enum PomError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Root element is <{0}>, expected <project>")]
    NotAProject(String),

    #[error("Descriptor has no <project> element")]
    Empty,
}

/// Parses one POM document into a raw descriptor
pub fn parse_pom(xml: &str) -> Result<Descriptor, PomError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = PomParser::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => parser.handle_start(e)?,
            Ok(Event::Empty(ref e)) => {
                parser.handle_start(e)?;
                parser.handle_end();
            }
            Ok(Event::Text(ref e)) => parser.handle_text(e),
            Ok(Event::CData(ref e)) => parser.handle_cdata(e),
            Ok(Event::End(_)) => parser.handle_end(),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(PomError::Xml(e.to_string())),
        }
    }

    parser.finish()
}

/// Element-path state machine for POM documents
struct PomParser {
    descriptor: Descriptor,
    path: Vec<String>,
    text: String,
    seen_root: bool,
}

impl PomParser {
    fn new() -> Self {
        Self {
            descriptor: Descriptor::default(),
            path: Vec::new(),
            text: String::new(),
            seen_root: false,
        }
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) -> Result<(), PomError> {
        let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

        if self.path.is_empty() {
            if self.seen_root {
                return Err(PomError::Xml(format!("unexpected second root element <{}>", tag)));
            }
            if tag != "project" {
                return Err(PomError::NotAProject(tag));
            }
            self.seen_root = true;
        }

        self.path.push(tag);
        self.text.clear();
        self.open_record();
        Ok(())
    }

    /// Starts a new record when entering a repeated or nested element
    fn open_record(&mut self) {
        let d = &mut self.descriptor;
        match path_of(&self.path).as_slice() {
            ["project", "parent"] => d.parent = Some(ParentRef::default()),
            ["project", "licenses", "license"] => d.licenses.push(License::default()),
            ["project", "developers", "developer"] => d.developers.push(Developer::default()),
            ["project", "organization"] => {
                d.organization.get_or_insert_with(Organization::default);
            }
            ["project", "scm"] => {
                d.scm.get_or_insert_with(Scm::default);
            }
            ["project", "dependencyManagement", "dependencies", "dependency"] => {
                d.dependency_management.push(DependencyRef::default())
            }
            ["project", "dependencies", "dependency"] => {
                d.dependencies.push(DependencyRef::default())
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, e: &BytesText<'_>) {
        match e.unescape() {
            Ok(text) => self.text.push_str(&text),
            Err(_) => self.text.push_str(&String::from_utf8_lossy(&e[..])),
        }
    }

    fn handle_cdata(&mut self, e: &BytesCData<'_>) {
        self.text.push_str(&String::from_utf8_lossy(&e[..]));
    }

    fn handle_end(&mut self) {
        let value = self.text.trim().to_string();
        self.assign(value);
        self.path.pop();
        self.text.clear();
    }

    fn assign(&mut self, value: String) {
        let d = &mut self.descriptor;
        let path = path_of(&self.path);

        // Properties keep empty values; every other field ignores them
        if let ["project", "properties", key] = path.as_slice() {
            d.properties.insert(key.to_string(), value);
            return;
        }
        if value.is_empty() {
            return;
        }
        let value = Some(value);

        match path.as_slice() {
            ["project", "groupId"] => d.group_id = value,
            ["project", "artifactId"] => d.artifact_id = value,
            ["project", "version"] => d.version = value,
            ["project", "packaging"] => d.packaging = value,
            ["project", "name"] => d.name = value,
            ["project", "description"] => d.description = value,
            ["project", "url"] => d.url = value,
            ["project", "parent", field] => {
                if let Some(parent) = d.parent.as_mut() {
                    match *field {
                        "groupId" => parent.group_id = value,
                        "artifactId" => parent.artifact_id = value,
                        "version" => parent.version = value,
                        "relativePath" => parent.relative_path = value,
                        _ => {}
                    }
                }
            }
            ["project", "licenses", "license", field] => {
                if let Some(license) = d.licenses.last_mut() {
                    match *field {
                        "name" => license.name = value,
                        "url" => license.url = value,
                        "distribution" => license.distribution = value,
                        "comments" => license.comments = value,
                        _ => {}
                    }
                }
            }
            ["project", "organization", field] => {
                if let Some(org) = d.organization.as_mut() {
                    match *field {
                        "name" => org.name = value,
                        "url" => org.url = value,
                        _ => {}
                    }
                }
            }
            ["project", "developers", "developer", field] => {
                if let Some(dev) = d.developers.last_mut() {
                    match *field {
                        "id" => dev.id = value,
                        "name" => dev.name = value,
                        "email" => dev.email = value,
                        "organization" => dev.organization = value,
                        _ => {}
                    }
                }
            }
            ["project", "scm", field] => {
                if let Some(scm) = d.scm.as_mut() {
                    match *field {
                        "url" => scm.url = value,
                        "connection" => scm.connection = value,
                        "tag" => scm.tag = value,
                        _ => {}
                    }
                }
            }
            ["project", "dependencyManagement", "dependencies", "dependency", field] => {
                if let Some(dep) = d.dependency_management.last_mut() {
                    assign_dependency(dep, field, value);
                }
            }
            ["project", "dependencies", "dependency", field] => {
                if let Some(dep) = d.dependencies.last_mut() {
                    assign_dependency(dep, field, value);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<Descriptor, PomError> {
        if !self.seen_root {
            return Err(PomError::Empty);
        }
        if let Some(open) = self.path.last() {
            return Err(PomError::Xml(format!("unclosed element <{}>", open)));
        }
        Ok(self.descriptor)
    }
}

fn path_of(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fn assign_dependency(dep: &mut DependencyRef, field: &str, value: Option<String>) {
    match field {
        "groupId" => dep.group_id = value,
        "artifactId" => dep.artifact_id = value,
        "version" => dep.version = value,
        "type" => dep.dep_type = value,
        "classifier" => dep.classifier = value,
        "scope" => dep.scope = value,
        "optional" => dep.optional = value,
        _ => {}
    }
}
