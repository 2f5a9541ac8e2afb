//! Server-rendered pages: the uploader home page and the share view.
//!
//! Markup is deliberately bare. The pages exist to carry the CSRF token and to
//! point at the right URLs, not to look good.

use serde::Serialize;

use crate::csrf::{CsrfToken, CSRF_META_NAME};

/// How a stored file is previewed, decided from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Other,
}

impl FileKind {
    /// Classify by filename suffix (case-insensitive). No content sniffing.
    pub fn from_filename(name: &str) -> Self {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return FileKind::Other,
        };
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => FileKind::Image,
            "pdf" => FileKind::Pdf,
            _ => FileKind::Other,
        }
    }

    /// Classify a pending file by its declared MIME type.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileKind::Image
        } else if mime_type == "application/pdf" {
            FileKind::Pdf
        } else {
            FileKind::Other
        }
    }
}

pub fn direct_path(stored_filename: &str) -> String {
    format!("/uploads/{stored_filename}")
}

pub fn share_path(stored_filename: &str) -> String {
    format!("/shared/{stored_filename}")
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n{head}</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// Uploader page. Each render carries its own freshly issued token.
pub fn render_home(token: &CsrfToken, max_files: usize) -> String {
    let head = format!(
        "<meta name=\"{CSRF_META_NAME}\" content=\"{}\">\n",
        escape_html(token.as_str())
    );
    let body = format!(
        "<main>\n<h1>Secure File Uploader</h1>\n\
         <p>Upload up to {max_files} files (PDF, JPG, PNG) - Max 10MB each</p>\n\
         <form id=\"upload\" action=\"/api/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\".jpg,.jpeg,.png,.pdf\">\n\
         <input type=\"hidden\" name=\"csrfToken\" value=\"{}\">\n\
         </form>\n</main>\n",
        escape_html(token.as_str())
    );
    document("Secure File Uploader", &head, &body)
}

/// Share view for a file known to exist.
pub fn render_shared(stored_filename: &str, share_url: &str) -> String {
    let name = escape_html(stored_filename);
    let file_url = escape_html(&direct_path(stored_filename));

    let preview = match FileKind::from_filename(stored_filename) {
        FileKind::Image => format!("<img class=\"preview\" src=\"{file_url}\" alt=\"{name}\">"),
        FileKind::Pdf => format!("<div class=\"preview document\"><p>{name}</p></div>"),
        FileKind::Other => format!("<div class=\"preview file\"><p>{name}</p></div>"),
    };

    let body = format!(
        "<main>\n<h1>Shared File</h1>\n{preview}\n\
         <input id=\"share-url\" readonly value=\"{}\">\n\
         <button type=\"button\" data-copy=\"share-url\">Copy Link</button>\n\
         <a class=\"download\" href=\"{file_url}\" download>Download</a>\n\
         <a href=\"/\">Return to Uploader</a>\n</main>\n",
        escape_html(share_url)
    );
    document("Shared File", "", &body)
}

pub fn render_not_found(message: &str) -> String {
    let body = format!(
        "<main>\n<h1>File Not Found</h1>\n<p>{}</p>\n\
         <a href=\"/\">Return to Home</a>\n</main>\n",
        escape_html(message)
    );
    document("File Not Found", "", &body)
}
