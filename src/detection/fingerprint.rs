// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Technology Fingerprinting
 * Header, cookie, meta-generator, and body signature matching
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::http_client::HttpResponse;

/// Groups related technologies for cleaner reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TechCategory {
    WebServer,
    Language,
    Framework,
    Cms,
    JsLibrary,
    Cdn,
    Other,
}

/// A fingerprint for a single technology. Detection runs through four
/// layers in order: header, cookie, meta tag, body pattern.
struct TechSignature {
    name: &'static str,
    category: TechCategory,
    /// Response header to inspect (case-insensitive name).
    header_name: &'static str,
    /// Substring match against the header value; empty means presence of
    /// the header is enough.
    header_value: &'static str,
    /// Cookie name substring match.
    cookie_name: &'static str,
    /// `<meta name="generator" content="...">` substring match.
    meta_tag: &'static str,
    /// Raw body substring match (case-insensitive).
    body_pattern: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechMatch {
    pub name: String,
    pub category: TechCategory,
}

const NONE: TechSignature = TechSignature {
    name: "",
    category: TechCategory::Other,
    header_name: "",
    header_value: "",
    cookie_name: "",
    meta_tag: "",
    body_pattern: "",
};

/// Master fingerprint list, ordered roughly by how common each technology is
/// in the wild. Deliberately lean; this catches the obvious stack during a
/// discovery scan rather than replicating a full fingerprinting suite.
#[rustfmt::skip]
const TECH_SIGNATURES: &[TechSignature] = &[
    // Web servers
    TechSignature { name: "Nginx", category: TechCategory::WebServer, header_name: "Server", header_value: "nginx", ..NONE },
    TechSignature { name: "Apache", category: TechCategory::WebServer, header_name: "Server", header_value: "apache", ..NONE },
    TechSignature { name: "IIS", category: TechCategory::WebServer, header_name: "Server", header_value: "microsoft-iis", ..NONE },
    TechSignature { name: "LiteSpeed", category: TechCategory::WebServer, header_name: "Server", header_value: "litespeed", ..NONE },
    TechSignature { name: "Caddy", category: TechCategory::WebServer, header_name: "Server", header_value: "caddy", ..NONE },
    TechSignature { name: "Openresty", category: TechCategory::WebServer, header_name: "Server", header_value: "openresty", ..NONE },
    TechSignature { name: "Gunicorn", category: TechCategory::WebServer, header_name: "Server", header_value: "gunicorn", ..NONE },
    TechSignature { name: "Cowboy", category: TechCategory::WebServer, header_name: "Server", header_value: "cowboy", ..NONE },

    // Languages / runtimes
    TechSignature { name: "PHP", category: TechCategory::Language, header_name: "X-Powered-By", header_value: "php", ..NONE },
    TechSignature { name: "PHP", category: TechCategory::Language, cookie_name: "PHPSESSID", ..NONE },
    TechSignature { name: "ASP.NET", category: TechCategory::Language, header_name: "X-Powered-By", header_value: "asp.net", ..NONE },
    TechSignature { name: "ASP.NET", category: TechCategory::Language, header_name: "X-AspNet-Version", ..NONE },
    TechSignature { name: "ASP.NET", category: TechCategory::Language, cookie_name: "ASP.NET_SessionId", ..NONE },
    TechSignature { name: "Java", category: TechCategory::Language, cookie_name: "JSESSIONID", ..NONE },
    TechSignature { name: "Express", category: TechCategory::Framework, header_name: "X-Powered-By", header_value: "express", ..NONE },
    TechSignature { name: "Python", category: TechCategory::Language, header_name: "X-Powered-By", header_value: "python", ..NONE },
    TechSignature { name: "Django", category: TechCategory::Framework, cookie_name: "csrftoken", ..NONE },
    TechSignature { name: "Django", category: TechCategory::Framework, cookie_name: "django_language", ..NONE },
    TechSignature { name: "Rails", category: TechCategory::Framework, header_name: "X-Powered-By", header_value: "phusion passenger", ..NONE },
    TechSignature { name: "Rails", category: TechCategory::Framework, cookie_name: "_rails_session", ..NONE },

    // CMS
    TechSignature { name: "WordPress", category: TechCategory::Cms, meta_tag: "wordpress", ..NONE },
    TechSignature { name: "WordPress", category: TechCategory::Cms, body_pattern: "wp-content", ..NONE },
    TechSignature { name: "WordPress", category: TechCategory::Cms, body_pattern: "wp-includes", ..NONE },
    TechSignature { name: "Joomla", category: TechCategory::Cms, meta_tag: "joomla", ..NONE },
    TechSignature { name: "Joomla", category: TechCategory::Cms, body_pattern: "/media/jui/", ..NONE },
    TechSignature { name: "Drupal", category: TechCategory::Cms, meta_tag: "drupal", ..NONE },
    TechSignature { name: "Drupal", category: TechCategory::Cms, header_name: "X-Generator", header_value: "drupal", ..NONE },
    TechSignature { name: "Drupal", category: TechCategory::Cms, body_pattern: "sites/default/files", ..NONE },
    TechSignature { name: "Shopify", category: TechCategory::Cms, body_pattern: "cdn.shopify.com", ..NONE },

    // JS frameworks / libraries
    TechSignature { name: "React", category: TechCategory::JsLibrary, body_pattern: "__NEXT_DATA__", ..NONE },
    TechSignature { name: "React", category: TechCategory::JsLibrary, body_pattern: "data-reactroot", ..NONE },
    TechSignature { name: "Next.js", category: TechCategory::Framework, header_name: "X-Powered-By", header_value: "next.js", ..NONE },
    TechSignature { name: "Next.js", category: TechCategory::Framework, body_pattern: "_next/static", ..NONE },
    TechSignature { name: "Nuxt.js", category: TechCategory::Framework, body_pattern: "__nuxt", ..NONE },
    TechSignature { name: "Vue.js", category: TechCategory::JsLibrary, body_pattern: "data-v-", ..NONE },
    TechSignature { name: "Angular", category: TechCategory::JsLibrary, body_pattern: "ng-version=", ..NONE },
    TechSignature { name: "jQuery", category: TechCategory::JsLibrary, body_pattern: "jquery.min.js", ..NONE },
    TechSignature { name: "jQuery", category: TechCategory::JsLibrary, body_pattern: "jquery/", ..NONE },

    // CDN / hosting
    TechSignature { name: "AWS S3", category: TechCategory::Cdn, header_name: "Server", header_value: "amazons3", ..NONE },
    TechSignature { name: "Heroku", category: TechCategory::Cdn, header_name: "Via", header_value: "heroku", ..NONE },
    TechSignature { name: "Vercel", category: TechCategory::Cdn, header_name: "X-Vercel-Id", ..NONE },
    TechSignature { name: "Netlify", category: TechCategory::Cdn, header_name: "X-Nf-Request-Id", ..NONE },
    TechSignature { name: "Firebase", category: TechCategory::Cdn, header_name: "X-Served-By", header_value: "firebase", ..NONE },

    // Other
    TechSignature { name: "OpenSSL", category: TechCategory::Other, header_name: "Server", header_value: "openssl", ..NONE },
    TechSignature { name: "Laravel", category: TechCategory::Framework, cookie_name: "laravel_session", ..NONE },
    TechSignature { name: "Laravel", category: TechCategory::Framework, cookie_name: "XSRF-TOKEN", ..NONE },
    TechSignature { name: "Spring", category: TechCategory::Framework, cookie_name: "JSESSIONID", ..NONE },
    TechSignature { name: "Flask", category: TechCategory::Framework, header_name: "Server", header_value: "werkzeug", ..NONE },
];

/// Inspects a response's headers, cookies, and body for known technology
/// fingerprints. Each technology name reports at most once no matter how
/// many of its signatures match.
pub fn detect_technologies(response: &HttpResponse, body: &str) -> Vec<TechMatch> {
    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    let lower_body = body.to_lowercase();

    for sig in TECH_SIGNATURES {
        if seen.contains(sig.name) {
            continue;
        }

        if matches_tech_signature(response, &lower_body, sig) {
            seen.insert(sig.name);
            matches.push(TechMatch {
                name: sig.name.to_string(),
                category: sig.category,
            });
        }
    }

    matches
}

/// Convenience wrapper returning just the technology names.
pub fn detect_tech_names(response: &HttpResponse, body: &str) -> Vec<String> {
    detect_technologies(response, body)
        .into_iter()
        .map(|m| m.name)
        .collect()
}

fn matches_tech_signature(response: &HttpResponse, lower_body: &str, sig: &TechSignature) -> bool {
    if !sig.header_name.is_empty() {
        if let Some(value) = response.header(sig.header_name) {
            if !value.is_empty() {
                // No expected value means header presence is enough.
                if sig.header_value.is_empty() {
                    return true;
                }
                if value.to_lowercase().contains(sig.header_value) {
                    return true;
                }
            }
        }
    }

    if !sig.cookie_name.is_empty()
        && response
            .cookies
            .iter()
            .any(|cookie| cookie.contains(sig.cookie_name))
    {
        return true;
    }

    if !sig.meta_tag.is_empty()
        && lower_body.contains(sig.meta_tag)
        && lower_body.contains("generator")
    {
        return true;
    }

    if !sig.body_pattern.is_empty() && lower_body.contains(&sig.body_pattern.to_lowercase()) {
        return true;
    }

    false
}
