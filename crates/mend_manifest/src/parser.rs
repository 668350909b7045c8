//! Section discovery and typed record extraction.

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{
    compile_name, strip_phase_suffix, BuildFileEntry, FileReference, Manifest, PhaseEntry,
    RefKind, Section, SectionKind, SourcesPhase,
};
use crate::scanner::{Record, Scanner, Value};
use mend_common::ObjectId;
use mend_source::TextRange;

const BEGIN_PREFIX: &str = "/* Begin ";
const MARKER_SUFFIX: &str = " section */";

/// Parses manifest text into a [`Manifest`].
///
/// Only the modeled sections are interpreted; every record inside them must
/// match the record grammar completely or parsing fails with the byte offset
/// of the record. Text outside those sections is never inspected beyond
/// locating section markers.
pub fn parse(text: &str) -> Result<Manifest, ParseError> {
    let mut head = Scanner::new(text, 0, text.len());
    head.trivia()?;
    if !text[head.pos()..].starts_with('{') {
        return Err(ParseError::new(ParseErrorKind::NotAManifest, head.pos()));
    }

    let mut manifest = Manifest::empty(text);
    for (isa, section) in find_sections(text)? {
        let Some(kind) = SectionKind::from_isa(isa) else {
            continue;
        };
        let section = Section {
            kind,
            range: section.range,
            body: section.body,
            insert_at: line_after(text, section.body.start),
        };
        parse_section(text, &section, &mut manifest)?;
        manifest.sections.push(section);
    }
    Ok(manifest)
}

struct RawSection {
    range: TextRange,
    body: TextRange,
}

fn find_sections(text: &str) -> Result<Vec<(&str, RawSection)>, ParseError> {
    let mut sections = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find(BEGIN_PREFIX) {
        let begin = cursor + rel;
        let name_start = begin + BEGIN_PREFIX.len();
        let line_end = text[name_start..]
            .find('\n')
            .map_or(text.len(), |i| name_start + i);
        let Some(name_len) = text[name_start..line_end].find(MARKER_SUFFIX) else {
            cursor = name_start;
            continue;
        };
        let isa = &text[name_start..name_start + name_len];
        if isa.is_empty() || isa.contains(char::is_whitespace) {
            cursor = name_start;
            continue;
        }
        let body_start = name_start + name_len + MARKER_SUFFIX.len();
        let end_marker = format!("/* End {isa}{MARKER_SUFFIX}");
        let Some(end_rel) = text[body_start..].find(&end_marker) else {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedSection {
                    isa: isa.to_string(),
                },
                begin,
            ));
        };
        let body_end = body_start + end_rel;
        let end = body_end + end_marker.len();
        sections.push((
            isa,
            RawSection {
                range: TextRange::new(begin, end),
                body: TextRange::new(body_start, body_end),
            },
        ));
        cursor = end;
    }
    Ok(sections)
}

/// The start of the line following `offset`, or `offset` if there is none.
fn line_after(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(offset, |i| offset + i + 1)
}

fn parse_section(
    text: &str,
    section: &Section,
    manifest: &mut Manifest,
) -> Result<(), ParseError> {
    let mut scanner = Scanner::new(text, section.body.start, section.body.end);
    loop {
        scanner.trivia()?;
        if scanner.at_end() {
            return Ok(());
        }
        let record = scanner.record()?;
        let start = record.range.start;
        check_isa(&record, section.kind).map_err(|e| e.in_record(start))?;
        match section.kind {
            SectionKind::BuildFile => manifest.build_files.push(build_file(record)),
            SectionKind::FileReference => {
                manifest
                    .file_references
                    .push(file_reference(record, RefKind::File)?);
            }
            SectionKind::VariantGroup => {
                manifest
                    .file_references
                    .push(file_reference(record, RefKind::VariantGroup)?);
            }
            SectionKind::VersionGroup => {
                manifest
                    .file_references
                    .push(file_reference(record, RefKind::VersionGroup)?);
            }
            SectionKind::SourcesBuildPhase => manifest.phases.push(sources_phase(record)?),
        }
    }
}

fn check_isa(record: &Record, kind: SectionKind) -> Result<(), ParseError> {
    match record.scalar("isa") {
        Some(isa) if isa == kind.isa() => Ok(()),
        Some(isa) => Err(ParseError::new(
            ParseErrorKind::IsaMismatch {
                section: kind.isa().to_string(),
                found: isa.to_string(),
            },
            record.range.start,
        )),
        None => Err(missing(record, "isa")),
    }
}

fn missing(record: &Record, field: &'static str) -> ParseError {
    ParseError::new(ParseErrorKind::MissingField { field }, record.range.start)
        .in_record(record.range.start)
}

fn build_file(record: Record) -> BuildFileEntry {
    BuildFileEntry {
        file_ref: record.scalar("fileRef").map(ObjectId::from),
        display_name: record
            .comment
            .as_deref()
            .map(strip_phase_suffix)
            .unwrap_or_default()
            .to_string(),
        id: ObjectId::new(record.id),
        range: record.range,
    }
}

fn file_reference(record: Record, kind: RefKind) -> Result<FileReference, ParseError> {
    let path = match (record.scalar("path"), record.scalar("name")) {
        (Some(path), _) => path.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) if kind == RefKind::File => return Err(missing(&record, "path")),
        (None, None) => String::new(),
    };
    let display_name = record
        .comment
        .clone()
        .or_else(|| record.scalar("name").map(str::to_string))
        .unwrap_or_else(|| compile_name(&path).to_string());
    Ok(FileReference {
        id: ObjectId::new(record.id),
        path,
        display_name,
        kind,
        range: record.range,
    })
}

fn sources_phase(record: Record) -> Result<SourcesPhase, ParseError> {
    let Some(Value::List(list)) = record.field("files") else {
        return Err(missing(&record, "files"));
    };
    let mut files = Vec::with_capacity(list.items.len());
    for item in &list.items {
        let Some(value) = &item.value else {
            return Err(ParseError::new(
                ParseErrorKind::Unexpected {
                    expected: "build file id",
                    found: '{',
                },
                item.range.start,
            )
            .in_record(record.range.start));
        };
        files.push(PhaseEntry {
            build_file_id: ObjectId::new(value.as_str()),
            display_name: item
                .comment
                .as_deref()
                .map(strip_phase_suffix)
                .unwrap_or_default()
                .to_string(),
            range: item.range,
        });
    }
    let files_close = list.close;
    Ok(SourcesPhase {
        id: ObjectId::new(record.id.as_str()),
        name: record.comment.clone().unwrap_or_else(|| "Sources".to_string()),
        files,
        files_close,
        range: record.range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "// !$*UTF8*$!
{
\tarchiveVersion = 1;
\tobjects = {

/* Begin PBXBuildFile section */
\t\tB1 /* Main.swift in Sources */ = {isa = PBXBuildFile; fileRef = F1 /* Main.swift */; };
\t\tB2 /* Time.swift in Sources */ = {isa = PBXBuildFile; fileRef = F2 /* Time.swift */; };
\t\tB3 /* Kit in Frameworks */ = {isa = PBXBuildFile; productRef = P1 /* Kit */; };
/* End PBXBuildFile section */

/* Begin PBXFileReference section */
\t\tF1 /* Main.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = Main.swift; sourceTree = \"<group>\"; };
\t\tF2 /* Time.swift */ = {isa = PBXFileReference; lastKnownFileType = sourcecode.swift; path = Utils/Time.swift; sourceTree = \"<group>\"; };
/* End PBXFileReference section */

/* Begin PBXGroup section */
\t\tG1 = {isa = PBXGroup; children = (F1, F2, ); sourceTree = \"<group>\"; };
/* End PBXGroup section */

/* Begin PBXSourcesBuildPhase section */
\t\tS1 /* Sources */ = {
\t\t\tisa = PBXSourcesBuildPhase;
\t\t\tbuildActionMask = 2147483647;
\t\t\tfiles = (
\t\t\t\tB1 /* Main.swift in Sources */,
\t\t\t\tB2 /* Time.swift in Sources */,
\t\t\t);
\t\t\trunOnlyForDeploymentPostprocessing = 0;
\t\t};
/* End PBXSourcesBuildPhase section */

/* Begin PBXVariantGroup section */
\t\tV1 /* Localizable.strings */ = {isa = PBXVariantGroup; children = (); name = Localizable.strings; sourceTree = \"<group>\"; };
/* End PBXVariantGroup section */
\t};
\trootObject = R1;
}
";

    #[test]
    fn parses_all_tables() {
        let m = parse(SAMPLE).unwrap();
        assert_eq!(m.build_files.len(), 3);
        assert_eq!(m.file_references.len(), 3);
        assert_eq!(m.phases.len(), 1);
        assert_eq!(m.sections.len(), 4);

        let b2 = m.build_file("B2").unwrap();
        assert_eq!(b2.file_ref.as_ref().map(ObjectId::as_str), Some("F2"));
        assert_eq!(b2.display_name, "Time.swift");
        assert!(b2.range.slice(SAMPLE).starts_with("B2 /*"));
        assert!(b2.range.slice(SAMPLE).ends_with("};"));

        assert_eq!(m.build_file("B3").unwrap().file_ref, None);

        let f2 = m.file_reference("F2").unwrap();
        assert_eq!(f2.path, "Utils/Time.swift");
        assert_eq!(f2.compile_name(), "Time.swift");
        assert_eq!(f2.kind, RefKind::File);

        let v1 = m.file_reference("V1").unwrap();
        assert_eq!(v1.kind, RefKind::VariantGroup);
        assert_eq!(v1.path, "Localizable.strings");
    }

    #[test]
    fn phase_entries_and_close() {
        let m = parse(SAMPLE).unwrap();
        let phase = &m.phases[0];
        assert_eq!(phase.name, "Sources");
        let ids: Vec<&str> = phase.files.iter().map(|e| e.build_file_id.as_str()).collect();
        assert_eq!(ids, ["B1", "B2"]);
        assert_eq!(
            phase.files[1].range.slice(SAMPLE),
            "B2 /* Time.swift in Sources */,"
        );
        assert_eq!(&SAMPLE[phase.files_close..phase.files_close + 2], ");");
    }

    #[test]
    fn section_insert_point_is_after_begin_line() {
        let m = parse(SAMPLE).unwrap();
        let bf = m.section(SectionKind::BuildFile).unwrap();
        assert!(SAMPLE[bf.insert_at..].starts_with("\t\tB1 /*"));
        assert!(bf.range.slice(SAMPLE).starts_with("/* Begin PBXBuildFile section */"));
        assert!(bf.range.slice(SAMPLE).ends_with("/* End PBXBuildFile section */"));
    }

    #[test]
    fn concatenated_records_on_one_line() {
        let text = "{\n/* Begin PBXBuildFile section */\n\t\tB1 /* a.swift in Sources */ = {isa = PBXBuildFile; fileRef = F1 /* a.swift */; };B2 /* b.swift in Sources */ = {isa = PBXBuildFile; fileRef = F2; };B3 = {isa = PBXBuildFile; fileRef = F3; };\n/* End PBXBuildFile section */\n}\n";
        let m = parse(text).unwrap();
        let ids: Vec<&str> = m.build_files.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["B1", "B2", "B3"]);
        assert!(m.build_files[1].range.slice(text).starts_with("B2 /*"));
        assert_eq!(m.build_files[0].range.end, m.build_files[1].range.start);
    }

    #[test]
    fn not_a_manifest() {
        let err = parse("hello world").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NotAManifest);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn unterminated_section() {
        let text = "{\n/* Begin PBXBuildFile section */\n";
        let err = parse(text).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnterminatedSection {
                isa: "PBXBuildFile".into()
            }
        );
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn garbage_record_reports_offset() {
        let text = "{\n/* Begin PBXBuildFile section */\n\t\tB1 = {isa = PBXBuildFile; fileRef = F1; };\n\t\tB2 = {isa = PBXBuildFile fileRef = F2; };\n/* End PBXBuildFile section */\n}";
        let err = parse(text).unwrap_err();
        let b2 = text.find("B2").unwrap();
        assert_eq!(err.record_start, Some(b2));
        assert!(err.offset > b2);
    }

    #[test]
    fn isa_mismatch_is_rejected() {
        let text = "{\n/* Begin PBXFileReference section */\nB1 = {isa = PBXBuildFile; fileRef = F1; };\n/* End PBXFileReference section */\n}";
        let err = parse(text).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::IsaMismatch { .. }));
        assert_eq!(err.offset, text.find("B1").unwrap());
    }

    #[test]
    fn phase_without_files_is_rejected() {
        let text = "{\n/* Begin PBXSourcesBuildPhase section */\nS1 = {isa = PBXSourcesBuildPhase; };\n/* End PBXSourcesBuildPhase section */\n}";
        let err = parse(text).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingField { field: "files" });
    }

    #[test]
    fn file_reference_falls_back_to_name() {
        let text = "{\n/* Begin PBXFileReference section */\nF1 = {isa = PBXFileReference; name = \"My File.swift\"; sourceTree = SOURCE_ROOT; };\n/* End PBXFileReference section */\n}";
        let m = parse(text).unwrap();
        assert_eq!(m.file_references[0].path, "My File.swift");
        assert_eq!(m.file_references[0].display_name, "My File.swift");
    }

    #[test]
    fn marker_lookalike_in_prose_is_skipped() {
        let text = "{\n/* Begin the real work */\n/* Begin PBXBuildFile section */\n/* End PBXBuildFile section */\n}";
        let m = parse(text).unwrap();
        assert_eq!(m.sections.len(), 1);
        assert!(m.build_files.is_empty());
    }

    #[test]
    fn model_serializes_to_json() {
        let m = parse(SAMPLE).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["build_files"][0]["id"], "B1");
        assert!(json.get("raw_text").is_none());
    }
}
