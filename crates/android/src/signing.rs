//! Release signing credentials
//!
//! Credentials live in a Java properties file (`key.properties` by default)
//! kept out of version control. Passwords are wrapped in [`Secret`], which
//! only ever formats or serializes as a redacted placeholder.

use buildcfg_core::error::{Error, ErrorCode, Result, ResultExt};
use buildcfg_core::validation::Validator;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const REDACTED: &str = "********";

/// A secret string that never prints its contents
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the plaintext, for handing to the signing tool only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Keystore location and passwords for release signing
#[derive(Debug, Clone, Serialize)]
pub struct SigningCredential {
    /// Keystore file, from `storeFile`
    pub keystore_path: PathBuf,
    /// From `storePassword`
    pub store_password: Secret,
    /// Entry in the keystore, from `keyAlias`
    pub key_alias: String,
    /// From `keyPassword`
    pub key_password: Secret,
}

impl SigningCredential {
    /// Load credentials from a properties file
    ///
    /// A relative `storeFile` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::credential_file_not_found(path));
        }

        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("Reading credentials file {}", path.display()))?;
        let properties = parse_properties(&content)
            .context(format!("Reading credentials file {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        debug!(path = %path.display(), keys = properties.len(), "Parsed credentials file");

        Self::from_properties(&properties, base_dir)
            .context(format!("In credentials file {}", path.display()))
    }

    /// Build credentials from parsed properties
    pub fn from_properties(properties: &BTreeMap<String, String>, base_dir: &Path) -> Result<Self> {
        let get = |key: &str| properties.get(key).filter(|v| !v.is_empty()).cloned();

        let store_file = get("storeFile");
        let store_password = get("storePassword");
        let key_alias = get("keyAlias");
        let key_password = get("keyPassword");

        Validator::new()
            .present("storeFile", &store_file)
            .present("storePassword", &store_password)
            .present("keyAlias", &key_alias)
            .present("keyPassword", &key_password)
            .validate()
            .into_result()?;

        let store_file = expand_path("storeFile", &store_file.unwrap_or_default())?;
        let keystore_path = if store_file.is_absolute() {
            store_file
        } else {
            base_dir.join(store_file)
        };

        Ok(Self {
            keystore_path,
            store_password: Secret::new(store_password.unwrap_or_default()),
            key_alias: key_alias.unwrap_or_default(),
            key_password: Secret::new(key_password.unwrap_or_default()),
        })
    }

    /// Verify the keystore is present, as the packaging step requires
    pub fn ensure_keystore_exists(&self) -> Result<()> {
        if self.keystore_path.is_file() {
            Ok(())
        } else {
            Err(Error::credential_file_not_found(&self.keystore_path)
                .with_context("Keystore referenced by storeFile"))
        }
    }
}

/// Expand `~` and `$VAR` references in a configured path
///
/// CI pipelines commonly point `storeFile` at a location taken from the
/// environment.
pub(crate) fn expand_path(field: &str, raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| {
            Error::invalid_format(field, raw, "a path whose variables are set")
                .with_context(e.to_string())
        })
}

/// Parse Java properties content
///
/// Follows `java.util.Properties`: `key=value`, `key: value` and `key value`
/// forms, `#`/`!` comment lines, trailing backslash continuations and the
/// `\t \n \r \f \uXXXX` escapes. Leading whitespace is dropped from each
/// line; trailing whitespace is part of the value.
pub fn parse_properties(content: &str) -> Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();
    let mut logical = String::new();
    let mut continuing = false;
    let mut start_line = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_start();

        if !continuing {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            start_line = index + 1;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(line);
        continuing = false;
        insert_property(&mut properties, &logical, start_line)?;
        logical.clear();
    }

    if continuing {
        insert_property(&mut properties, &logical, start_line)?;
    }

    Ok(properties)
}

fn insert_property(
    properties: &mut BTreeMap<String, String>,
    line: &str,
    line_number: usize,
) -> Result<()> {
    let (key, value) = split_property(line);
    // Values may be passwords; report the line only
    let malformed = || {
        Error::new(
            ErrorCode::InvalidFormat,
            format!("Malformed \\uXXXX escape on properties line {}", line_number),
        )
    };

    let key = unescape(key).ok_or_else(malformed)?;
    if key.is_empty() {
        return Ok(());
    }
    let value = unescape(value).ok_or_else(malformed)?;
    properties.insert(key, value);
    Ok(())
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
    trailing % 2 == 1
}

/// Split a logical line into raw key and value
fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                // "key value" form, optionally followed by a separator
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }

    (line, "")
}

/// Resolve escapes; `None` on a malformed `\uXXXX`
fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{0c}'),
            Some('u') => {
                let unit = hex_unit(&mut chars)?;
                if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: the low half must follow as another escape
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return None;
                    }
                    let low = hex_unit(&mut chars)?;
                    out.push(char::decode_utf16([unit, low]).next()?.ok()?);
                } else {
                    out.push(char::from_u32(u32::from(unit))?);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Some(out)
}

fn hex_unit(chars: &mut std::str::Chars<'_>) -> Option<u16> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(&hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY_PROPERTIES: &str = "\
# Release signing
storeFile=my-release-key.jks
storePassword=hunter2#1
keyAlias = my-key-alias
keyPassword: hunter2#1
";

    #[test]
    fn test_parse_properties_separators() {
        let props = parse_properties(KEY_PROPERTIES).unwrap();
        assert_eq!(props.len(), 4);
        assert_eq!(props["keyAlias"], "my-key-alias");
        assert_eq!(props["keyPassword"], "hunter2#1");
        assert_eq!(props["storePassword"], "hunter2#1");
    }

    #[test]
    fn test_parse_properties_comments_and_blanks() {
        let props = parse_properties("\n! legacy comment\n  # indented\n\na=1\n").unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["a"], "1");
    }

    #[test]
    fn test_parse_properties_continuation_and_escapes() {
        let content = "path=/opt/\\\n    keys/release.jks\nodd\\=key=v\\:1\n";
        let props = parse_properties(content).unwrap();
        assert_eq!(props["path"], "/opt/keys/release.jks");
        assert_eq!(props["odd=key"], "v:1");
    }

    #[test]
    fn test_parse_properties_whitespace_separator() {
        let props = parse_properties("keyAlias   upload\nempty\n").unwrap();
        assert_eq!(props["keyAlias"], "upload");
        assert_eq!(props["empty"], "");
    }

    #[test]
    fn test_parse_properties_keeps_trailing_whitespace() {
        let props = parse_properties("storePassword=abc \nkeyAlias=upload\t\n").unwrap();
        assert_eq!(props["storePassword"], "abc ");
        assert_eq!(props["keyAlias"], "upload\t");
    }

    #[test]
    fn test_parse_properties_unicode_escapes() {
        let content = "keyPassword=p\\u0041ss\nk\\u00e9y=\\uD83D\\uDE00\n";
        let props = parse_properties(content).unwrap();
        assert_eq!(props["keyPassword"], "pAss");
        assert_eq!(props["k\u{e9}y"], "\u{1F600}");
    }

    #[test]
    fn test_parse_properties_escaped_trailing_space() {
        let props = parse_properties("keyAlias=a\\ \nkeyPassword=b\n").unwrap();
        assert_eq!(props["keyAlias"], "a ");
        assert_eq!(props["keyPassword"], "b");
    }

    #[test]
    fn test_parse_properties_malformed_unicode_escape() {
        let err = parse_properties("a=1\nstorePassword=hunter\\u00zz\n").unwrap_err();
        assert!(err.is(ErrorCode::InvalidFormat));
        assert!(err.message.contains("line 2"));
        assert!(!err.to_string().contains("hunter"));
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.to_string(), "********");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"********\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_load_resolves_keystore_relative_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, KEY_PROPERTIES).unwrap();

        let credential = SigningCredential::load(&path).unwrap();
        assert_eq!(credential.keystore_path, dir.path().join("my-release-key.jks"));
        assert_eq!(credential.key_alias, "my-key-alias");
        assert_eq!(credential.store_password.expose(), "hunter2#1");
    }

    #[test]
    fn test_credential_debug_hides_passwords() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, KEY_PROPERTIES).unwrap();

        let credential = SigningCredential::load(&path).unwrap();
        let debug = format!("{:?}", credential);
        let json = serde_json::to_string(&credential).unwrap();
        assert!(!debug.contains("hunter2"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("my-key-alias"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SigningCredential::load(Path::new("/nonexistent/key.properties")).unwrap_err();
        assert!(err.is(ErrorCode::CredentialFileNotFound));
    }

    #[test]
    fn test_load_missing_key_alias() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, "storeFile=k.jks\nstorePassword=a\nkeyPassword=b\n").unwrap();

        let err = SigningCredential::load(&path).unwrap_err();
        assert!(err.is(ErrorCode::MissingField));
        assert!(err.message.contains("keyAlias"));
    }

    #[test]
    fn test_store_file_expands_environment() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let mut props = parse_properties(KEY_PROPERTIES).unwrap();
        props.insert("storeFile".to_string(), "$HOME/release.jks".to_string());

        let credential = SigningCredential::from_properties(&props, dir.path()).unwrap();
        assert_eq!(credential.keystore_path, PathBuf::from(home).join("release.jks"));
    }

    #[test]
    fn test_store_file_with_unset_variable() {
        let mut props = parse_properties(KEY_PROPERTIES).unwrap();
        props.insert(
            "storeFile".to_string(),
            "$BUILDCFG_TEST_UNSET_VARIABLE/release.jks".to_string(),
        );

        let err = SigningCredential::from_properties(&props, Path::new(".")).unwrap_err();
        assert!(err.is(ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_ensure_keystore_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.properties");
        std::fs::write(&path, KEY_PROPERTIES).unwrap();
        let credential = SigningCredential::load(&path).unwrap();

        let err = credential.ensure_keystore_exists().unwrap_err();
        assert!(err.is(ErrorCode::CredentialFileNotFound));

        std::fs::write(dir.path().join("my-release-key.jks"), b"keystore").unwrap();
        assert!(credential.ensure_keystore_exists().is_ok());
    }
}
