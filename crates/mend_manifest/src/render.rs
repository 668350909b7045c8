//! Serialisation of new records in the grammar [`parse`](crate::parse) accepts.
//!
//! Renderers produce a single record without indentation or line break; the
//! caller copies the surrounding lines' indentation.

use mend_common::ObjectId;
use std::borrow::Cow;

/// Quotes a value if it is not a safe bare word.
pub fn quote(value: &str) -> Cow<'_, str> {
    let bare = !value.is_empty()
        && !value.contains("//")
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_$/:.-".contains(&b));
    if bare {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

/// Makes text safe to place inside a `/* */` annotation.
fn annotation(text: &str) -> Cow<'_, str> {
    if text.contains("*/") || text.contains('\n') {
        Cow::Owned(text.replace("*/", "* /").replace('\n', " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// The `lastKnownFileType` for a path, by extension.
pub fn file_type(path: &str) -> &'static str {
    let name = crate::model::compile_name(path);
    let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext {
        "swift" => "sourcecode.swift",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "c" => "sourcecode.c.c",
        "cc" | "cpp" | "cxx" => "sourcecode.cpp.cpp",
        "h" => "sourcecode.c.h",
        "hpp" => "sourcecode.cpp.h",
        "metal" => "sourcecode.metal",
        "s" => "sourcecode.asm",
        _ => "text",
    }
}

/// `ID /* name in Phase */ = {isa = PBXBuildFile; fileRef = REF /* name */; };`
pub fn build_file(id: &ObjectId, name: &str, file_ref: &ObjectId, phase_name: &str) -> String {
    let name = annotation(name);
    let phase_name = annotation(phase_name);
    format!(
        "{id} /* {name} in {phase_name} */ = {{isa = PBXBuildFile; fileRef = {file_ref} /* {name} */; }};"
    )
}

/// A `PBXFileReference` record relative to its group.
///
/// `name` is only written when it differs from the path.
pub fn file_reference(id: &ObjectId, name: &str, path: &str) -> String {
    let name_field = if name == path {
        String::new()
    } else {
        format!("name = {}; ", quote(name))
    };
    format!(
        "{id} /* {} */ = {{isa = PBXFileReference; lastKnownFileType = {}; {name_field}path = {}; sourceTree = \"<group>\"; }};",
        annotation(name),
        file_type(path),
        quote(path),
    )
}

/// `ID /* name in Phase */,`
pub fn phase_entry(build_file_id: &ObjectId, name: &str, phase_name: &str) -> String {
    format!(
        "{build_file_id} /* {} in {} */,",
        annotation(name),
        annotation(phase_name)
    )
}
