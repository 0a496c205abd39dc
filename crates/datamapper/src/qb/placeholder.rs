//! `?` placeholder scanning and identifier quoting.
//!
//! Statements are built with positional `?` markers. Quoted text (`'...'`,
//! `"..."`) and comments are skipped so a literal question mark is never
//! mistaken for a placeholder.

enum Piece<'a> {
    Text(&'a str),
    Placeholder,
}

/// Split `sql` into text runs and `?` placeholders found outside quotes and
/// comments.
fn scan<'a>(sql: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut start = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // doubled quote is an escape
                        if i + 1 < bytes.len() && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            b'?' => {
                emit(Piece::Text(&sql[start..i]));
                emit(Piece::Placeholder);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }

    if start < sql.len() {
        emit(Piece::Text(&sql[start..]));
    }
}

/// Number of `?` placeholders in `sql`.
pub fn count(sql: &str) -> usize {
    let mut n = 0;
    scan(sql, |piece| {
        if let Piece::Placeholder = piece {
            n += 1;
        }
    });
    n
}

/// Rewrite `?` placeholders to PostgreSQL's `$1, $2, ...`.
pub fn to_numbered(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = 0usize;
    scan(sql, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Placeholder => {
            idx += 1;
            use std::fmt::Write;
            let _ = write!(&mut out, "${}", idx);
        }
    });
    out
}

/// Quote an identifier with `"`, doubling embedded quotes.
///
/// Dotted names are quoted per segment (`public.users` → `"public"."users"`)
/// and `*` is left alone.
pub fn quote_ident(name: &str) -> String {
    if name == "*" {
        return name.to_string();
    }
    name.split('.')
        .map(|seg| {
            if seg == "*" {
                seg.to_string()
            } else {
                format!("\"{}\"", seg.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
