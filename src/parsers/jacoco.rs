/// Reader for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo .../>
///     <package name="com/example">
///       <class ...>
///         <method ...><counter type="LINE" missed="0" covered="3"/></method>
///         <counter type="LINE" missed="1" covered="5"/>
///       </class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///         <counter type="LINE" missed="1" covered="5"/>
///       </sourcefile>
///       <counter type="LINE" missed="1" covered="5"/>
///     </package>
///     <counter type="INSTRUCTION" missed="20" covered="80"/>
///     <counter type="LINE" missed="10" covered="30"/>
///   </report>
///
/// Counters repeat at every level. Only the report-level `LINE` counter
/// (a direct child of `<report>`) gives the project total.
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{get_attr, percent, xml_err, Parser};
use crate::error::Result;

pub struct JacocoParser;

impl Parser for JacocoParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut depth = 0usize;

        loop {
            buf.clear();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_err(e, &reader))?;
            match event {
                Event::Eof => break,
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Empty(ref e) if depth == 1 && e.name().as_ref() == b"counter" => {
                    if get_attr(e, b"type").as_deref() != Some("LINE") {
                        continue;
                    }
                    let count = |name: &[u8]| {
                        get_attr(e, name)
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(0)
                    };
                    let covered = count(b"covered");
                    let missed = count(b"missed");
                    return Ok(percent(covered, covered + missed));
                }
                _ => {}
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="demo">
  <sessioninfo id="host-1" start="1" dump="2"/>
  <package name="com/example">
    <class name="com/example/Foo" sourcefilename="Foo.java">
      <method name="run" desc="()V" line="10">
        <counter type="LINE" missed="0" covered="3"/>
      </method>
      <counter type="LINE" missed="1" covered="1"/>
    </class>
    <sourcefile name="Foo.java">
      <line nr="10" mi="0" ci="3" mb="0" cb="0"/>
      <counter type="LINE" missed="1" covered="1"/>
    </sourcefile>
    <counter type="LINE" missed="1" covered="1"/>
  </package>
  <counter type="INSTRUCTION" missed="5" covered="95"/>
  <counter type="LINE" missed="10" covered="30"/>
  <counter type="METHOD" missed="0" covered="4"/>
</report>"#;

    #[test]
    fn test_report_level_line_counter() {
        assert_eq!(JacocoParser.parse(REPORT).unwrap(), Some(75.0));
    }

    #[test]
    fn test_no_report_counter() {
        let input = br#"<report name="x"><package name="p"><counter type="LINE" missed="1" covered="1"/></package></report>"#;
        assert_eq!(JacocoParser.parse(input).unwrap(), None);
    }

    #[test]
    fn test_empty_counter() {
        let input = br#"<report name="x"><counter type="LINE" missed="0" covered="0"/></report>"#;
        assert_eq!(JacocoParser.parse(input).unwrap(), None);
    }
}
