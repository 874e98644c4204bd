#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SIMPLE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

pub const VALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
    <item>one</item>
    <item>two</item>
</root>"#;

pub const SCHEMA_VIOLATING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
    <item>one</item>
    <other>not allowed</other>
</root>"#;

pub const MALFORMED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
    <item>one</item>
</roo>"#;

pub const MALFORMED_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root" type="xs:doesNotExist"/>
</xs:schema>"#;

pub const SAMPLE_WORKFLOW_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<workflow>
  <name>Test Workflow</name>
  <on>
    <push>
      <branches>main</branches>
    </push>
  </on>
  <jobs>
    <job id="build">
      <runs-on>ubuntu-latest</runs-on>
      <steps>
        <step>
          <uses>actions/checkout@v4</uses>
        </step>
        <step>
          <name>Build</name>
          <run>echo Building...</run>
        </step>
      </steps>
    </job>
  </jobs>
</workflow>"#;

/// Emits an unclosed flow sequence
pub const BROKEN_YAML_XSLT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:output method="text" encoding="UTF-8"/>
  <xsl:template match="/">
    <xsl:text>name: broken&#10;jobs: [unclosed&#10;</xsl:text>
  </xsl:template>
</xsl:stylesheet>"#;

/// Paths to the files shipped with the crate
pub struct TestFixtures {
    pub root: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        }
    }

    pub fn stylesheet(&self) -> PathBuf {
        self.root.join("assets").join("github-actions-transform.xslt")
    }

    pub fn workflow_schema(&self) -> PathBuf {
        self.root.join("assets").join("github-actions-schema.xsd")
    }

    pub fn demo_workflow(&self) -> PathBuf {
        self.root.join("demos").join("ci-workflow.xml")
    }
}

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

pub fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}
