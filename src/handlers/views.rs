//! HTML for the sign-in and listing pages.
//!
//! Pages are assembled as strings; every interpolated value goes through
//! [`html_escape`].

use crate::{
    models::records::UserProfile,
    services::{lister::Listing, paths::DirPath},
};

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto}\
li{margin:.25rem 0}form.inline{display:inline;margin-left:.5rem}";

/// Browser URL for a directory listing.
pub fn directory_url(dir: &DirPath) -> String {
    if dir.is_root() {
        return "/".to_string();
    }
    let encoded = dir
        .as_str()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/directory/{}", encoded)
}

pub fn sign_in_page() -> String {
    let mut html = page_head("File manager");
    html.push_str("<h1>File manager</h1>");
    html.push_str(
        "<p>Sign in to manage your files. Your session is carried in the \
         <code>token</code> cookie.</p>",
    );
    html.push_str("</body></html>");
    html
}

pub fn listing_page(profile: &UserProfile, dir: &DirPath, listing: &Listing) -> String {
    let title = if dir.is_root() {
        "/".to_string()
    } else {
        format!("/{}", dir)
    };
    let mut html = page_head(&title);
    html.push_str(&format!(
        "<p>Signed in as {} &lt;{}&gt;</p>",
        html_escape(&profile.name),
        html_escape(&profile.email)
    ));
    html.push_str(&format!("<h1>{}</h1>", html_escape(&title)));
    if !dir.is_root() {
        html.push_str(&format!(
            "<p><a href=\"{}\">Up</a></p>",
            html_escape(&directory_url(&dir.parent()))
        ));
    }

    html.push_str("<h2>Directories</h2><ul>");
    for child in &listing.directories {
        let child_dir = DirPath::parse(child).unwrap_or_default();
        html.push_str(&format!(
            "<li><a href=\"{}\">{}/</a>{}</li>",
            html_escape(&directory_url(&child_dir)),
            html_escape(child_dir.name()),
            inline_form("/delete-directory", "dir_path", child, "Delete")
        ));
    }
    html.push_str("</ul>");

    html.push_str("<h2>Files</h2><ul>");
    for file in &listing.files {
        let name = file.rsplit_once('/').map_or(file.as_str(), |(_, n)| n);
        html.push_str(&format!(
            "<li>{}{}{}</li>",
            html_escape(name),
            inline_form("/download-file", "filename", file, "Download"),
            inline_form("/delete-file", "filename", file, "Delete")
        ));
    }
    html.push_str("</ul>");

    let parent = html_escape(dir.as_str());
    html.push_str(&format!(
        "<h2>New directory</h2>\
         <form method=\"post\" action=\"/add-directory\">\
         <input type=\"hidden\" name=\"parent_path\" value=\"{parent}\">\
         <input name=\"dir_name\" required> <button>Create</button></form>"
    ));
    html.push_str(&format!(
        "<h2>Upload</h2>\
         <form method=\"post\" action=\"/upload-file\" enctype=\"multipart/form-data\">\
         <input type=\"hidden\" name=\"directory\" value=\"{parent}\">\
         <input type=\"file\" name=\"file_name\" required> \
         <label><input type=\"checkbox\" name=\"overwrite\" value=\"true\"> allow duplicates</label> \
         <button>Upload</button></form>"
    ));
    html.push_str("</body></html>");
    html
}

fn page_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{}</style></head><body>",
        html_escape(title),
        STYLE
    )
}

fn inline_form(action: &str, field: &str, value: &str, label: &str) -> String {
    format!(
        "<form class=\"inline\" method=\"post\" action=\"{}\">\
         <input type=\"hidden\" name=\"{}\" value=\"{}\"><button>{}</button></form>",
        action,
        field,
        html_escape(value),
        label
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
