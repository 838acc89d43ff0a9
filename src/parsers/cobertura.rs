/// Reader for Cobertura XML coverage reports (also written by
/// `cargo tarpaulin --out Xml` and `coverage xml`).
///
/// Cobertura XML structure:
///   <coverage line-rate="0.875" lines-valid="80" lines-covered="70" ...>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="..." line-rate="...">
///             <methods>
///               <method name="..."><lines><line number="..." hits="..."/></lines></method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"/>
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// The root `line-rate` is authoritative. Generators that omit it still
/// list every line under `<class><lines>`; lines repeated inside
/// `<methods>` are not counted twice.
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{get_attr, percent, xml_err, Parser};
use crate::error::Result;

pub struct CoberturaParser;

impl Parser for CoberturaParser {
    fn parse(&self, input: &[u8]) -> Result<Option<f64>> {
        parse_cobertura(input)
    }
}

fn parse_cobertura(input: &[u8]) -> Result<Option<f64>> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut methods_depth = 0usize;
    let mut covered = 0u64;
    let mut total = 0u64;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_err(e, &reader))?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"coverage" => {
                    let rate = get_attr(e, b"line-rate").and_then(|r| r.parse::<f64>().ok());
                    if let Some(rate) = rate {
                        return Ok(Some(rate * 100.0));
                    }
                }
                b"methods" if is_start => methods_depth += 1,
                b"line" if methods_depth == 0 => {
                    let hits = get_attr(e, b"hits")
                        .and_then(|h| h.parse::<u64>().ok())
                        .unwrap_or(0);
                    total += 1;
                    if hits > 0 {
                        covered += 1;
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.name().as_ref() == b"methods" => {
                methods_depth = methods_depth.saturating_sub(1);
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(percent(covered, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_line_rate() {
        let input = br#"<?xml version="1.0" ?>
<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
<coverage line-rate="0.875" branch-rate="0.5" lines-covered="70" lines-valid="80" version="1.9">
  <packages/>
</coverage>"#;
        assert_eq!(CoberturaParser.parse(input).unwrap(), Some(87.5));
    }

    #[test]
    fn test_counts_class_lines_without_line_rate() {
        let input = br#"<coverage>
  <packages><package name="p"><classes>
    <class name="a" filename="src/a.rs">
      <methods>
        <method name="f"><lines><line number="1" hits="3"/></lines></method>
      </methods>
      <lines>
        <line number="1" hits="3"/>
        <line number="2" hits="0"/>
        <line number="3" hits="1"/>
        <line number="4" hits="0"/>
      </lines>
    </class>
  </classes></package></packages>
</coverage>"#;
        assert_eq!(CoberturaParser.parse(input).unwrap(), Some(50.0));
    }

    #[test]
    fn test_no_lines() {
        assert_eq!(CoberturaParser.parse(b"<coverage><packages/></coverage>").unwrap(), None);
    }

    #[test]
    fn test_malformed_xml() {
        let err = CoberturaParser.parse(b"<coverage><lines></coverage>").unwrap_err();
        assert!(err.to_string().contains("position"), "{err}");
    }
}
