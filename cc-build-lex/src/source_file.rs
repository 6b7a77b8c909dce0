/// Returns the file stem (base name without its final extension), case
/// preserved. A leading dot with no other dot (`.gitignore`-style hidden
/// file) is treated as having no extension.
pub fn file_stem(path: &str) -> &str {
    let base = base_name(path);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}

/// Returns the final extension (without the dot), case preserved.
pub fn extension(path: &str) -> Option<&str> {
    let base = base_name(path);
    match base.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&base[idx + 1..]),
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx"];
const LOWERCASE_SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++"];

/// True for header extensions, matched case-insensitively.
pub fn is_header(path: &str) -> bool {
    match extension(path) {
        Some(ext) => HEADER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// True for translation-unit extensions. `.S` (preprocessed assembly) is
/// matched case-sensitively since `.s` (plain assembly, no preprocessing)
/// is a different file kind; the rest are matched case-insensitively.
pub fn is_source(path: &str) -> bool {
    match extension(path) {
        Some("S") => true,
        Some(ext) => {
            LOWERCASE_SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        None => false,
    }
}

/// A path, relative to its containing build package.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SourceFile(String);

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        SourceFile(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    pub fn stem(&self) -> &str {
        file_stem(&self.0)
    }

    pub fn is_header(&self) -> bool {
        is_header(&self.0)
    }

    pub fn is_source(&self) -> bool {
        is_source(&self.0)
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod source_file_tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("foo.h", "foo")]
    #[case("dir/bar.HPP", "bar")]
    #[case(".hidden", ".hidden")]
    #[case("noext", "noext")]
    fn file_stem_test(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(file_stem(path), expected);
    }

    #[rstest]
    #[case("foo.h", true)]
    #[case("foo.H", true)]
    #[case("foo.HPP", true)]
    #[case("foo.cpp", false)]
    fn is_header_test(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_header(path), expected);
    }

    #[rstest]
    #[case("foo.c", true)]
    #[case("foo.CPP", true)]
    #[case("foo.S", true)]
    #[case("foo.s", false)]
    #[case("foo.h", false)]
    fn is_source_test(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_source(path), expected);
    }
}
