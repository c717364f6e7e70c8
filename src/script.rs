//! Script file name grammar.
//!
//! A script file name is `[name.][requestExtension.][METHOD.]scriptExtension`
//! with two to four dot-separated parts. Parsing only splits the name;
//! whether a name is a selector or a request extension is decided by the
//! tree analyser.

/// HTTP methods recognised in script names.
pub const METHODS: [&str; 8] = [
    "TRACE", "OPTIONS", "GET", "HEAD", "POST", "PUT", "DELETE", "PATCH",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptName {
    pub name: Option<String>,
    pub request_extension: Option<String>,
    pub request_method: Option<String>,
    pub script_extension: String,
    /// Number of dot-separated parts in the file name.
    pub parts: usize,
}

impl ScriptName {
    /// Parse a bare file name. Returns `None` when it is not a script name.
    pub fn parse(file_name: &str) -> Option<ScriptName> {
        let parts: Vec<&str> = file_name.split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return None;
        }
        let script_extension = parts[parts.len() - 1].to_string();
        let mut name = Some(parts[0].to_string());
        let mut request_extension = None;
        let mut request_method = None;
        match parts.len() {
            2 => {
                if is_method(parts[0]) {
                    request_method = name.take();
                }
            }
            3 => {
                // Only the middle token is checked against the method set here.
                if is_method(parts[1]) {
                    request_method = Some(parts[1].to_string());
                } else {
                    request_extension = Some(parts[1].to_string());
                }
            }
            _ => {
                request_extension = Some(parts[1].to_string());
                request_method = Some(parts[2].to_string());
            }
        }
        Some(ScriptName {
            name,
            request_extension,
            request_method,
            script_extension,
            parts: parts.len(),
        })
    }

    /// True when a two-part name repeats its script extension, e.g.
    /// `html.html`, and could equally be a selector or a request extension.
    pub fn name_is_ambiguous(&self) -> bool {
        if self.parts != 2 {
            return false;
        }
        match self.name.as_deref() {
            Some(name) => name == self.script_extension,
            None => false,
        }
    }
}

pub fn is_method(token: &str) -> bool {
    METHODS.contains(&token)
}
