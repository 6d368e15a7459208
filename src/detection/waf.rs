// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WAF Fingerprinting
 * Header, cookie, and block-page signature matching
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::http_client::HttpResponse;

struct WafSignature {
    name: &'static str,
    /// Substring of the Server header value (case-insensitive).
    server_header: &'static str,
    /// Substring of any header name (case-insensitive).
    custom_header: &'static str,
    /// Substring of any cookie name.
    cookie_pattern: &'static str,
}

const WAF_SIGNATURES: &[WafSignature] = &[
    WafSignature {
        name: "Cloudflare",
        server_header: "cloudflare",
        custom_header: "",
        cookie_pattern: "__cfduid",
    },
    WafSignature {
        name: "AWS WAF",
        server_header: "",
        custom_header: "X-Amz-Cf-Id",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Akamai",
        server_header: "AkamaiGHost",
        custom_header: "",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Imperva",
        server_header: "",
        custom_header: "X-Iinfo",
        cookie_pattern: "",
    },
    WafSignature {
        name: "F5 BigIP",
        server_header: "",
        custom_header: "",
        cookie_pattern: "BIGipServer",
    },
    WafSignature {
        name: "Sucuri",
        server_header: "Sucuri",
        custom_header: "",
        cookie_pattern: "",
    },
    WafSignature {
        name: "StackPath",
        server_header: "StackPath",
        custom_header: "",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Wordfence",
        server_header: "",
        custom_header: "X-Wf-",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Barracuda",
        server_header: "Barracuda",
        custom_header: "",
        cookie_pattern: "",
    },
    WafSignature {
        name: "ModSecurity",
        server_header: "Mod_Security",
        custom_header: "",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Fortinet FortiWeb",
        server_header: "",
        custom_header: "",
        cookie_pattern: "FORTIWAFSID",
    },
    WafSignature {
        name: "AWS Shield",
        server_header: "",
        custom_header: "X-Amzn-Trace-Id",
        cookie_pattern: "",
    },
    WafSignature {
        name: "DenyAll",
        server_header: "",
        custom_header: "",
        cookie_pattern: "sessioncookie",
    },
    WafSignature {
        name: "Cloudfront",
        server_header: "",
        custom_header: "X-Amz-Cf-Pop",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Fastly",
        server_header: "",
        custom_header: "X-Fastly-Request-ID",
        cookie_pattern: "",
    },
    WafSignature {
        name: "Varnish",
        server_header: "",
        custom_header: "X-Varnish",
        cookie_pattern: "",
    },
];

/// First signature matching the response's headers or cookies wins; returns
/// the WAF name or the empty string.
pub fn detect_waf(response: &HttpResponse) -> String {
    for waf in WAF_SIGNATURES {
        if !waf.server_header.is_empty() {
            if let Some(server) = response.header("Server") {
                if server
                    .to_lowercase()
                    .contains(&waf.server_header.to_lowercase())
                {
                    return waf.name.to_string();
                }
            }
        }

        if !waf.custom_header.is_empty() {
            let needle = waf.custom_header.to_lowercase();
            if response.headers.keys().any(|name| name.contains(&needle)) {
                return waf.name.to_string();
            }
        }

        if !waf.cookie_pattern.is_empty()
            && response
                .cookies
                .iter()
                .any(|cookie| cookie.contains(waf.cookie_pattern))
        {
            return waf.name.to_string();
        }
    }

    String::new()
}

/// Secondary body-based check for block pages; first phrase match wins.
pub fn detect_waf_from_body(body: &str) -> String {
    const BODY_PATTERNS: &[(&str, &str)] = &[
        ("Access Denied", "Generic WAF"),
        ("Request blocked", "Generic WAF"),
        ("Sorry, you have been blocked", "Cloudflare"),
        ("This request has been blocked", "Generic WAF"),
        ("Web Application Firewall", "Generic WAF"),
        ("<title>Attention Required", "Cloudflare"),
        ("<title>Just a moment", "Cloudflare"),
        ("Powered by Wordfence", "Wordfence"),
        ("ModSecurity", "ModSecurity"),
        ("<title>403 Forbidden</title>", "Generic WAF"),
    ];

    let lower_body = body.to_lowercase();
    for (pattern, waf_name) in BODY_PATTERNS {
        if lower_body.contains(&pattern.to_lowercase()) {
            return waf_name.to_string();
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response_with(headers: &[(&str, &str)], cookies: &[&str]) -> HttpResponse {
        let mut map = HashMap::new();
        for (name, value) in headers {
            map.insert(name.to_lowercase(), value.to_string());
        }
        HttpResponse {
            status_code: 200,
            headers: map,
            cookies: cookies.iter().map(|c| c.to_string()).collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_cloudflare_via_server_header() {
        let resp = response_with(&[("Server", "cloudflare")], &[]);
        assert_eq!(detect_waf(&resp), "Cloudflare");
    }

    #[test]
    fn test_cloudflare_case_insensitive() {
        let resp = response_with(&[("Server", "CloudFlare-nginx")], &[]);
        assert_eq!(detect_waf(&resp), "Cloudflare");
    }

    #[test]
    fn test_aws_waf_via_custom_header() {
        let resp = response_with(&[("X-Amz-Cf-Id", "test")], &[]);
        assert_eq!(detect_waf(&resp), "AWS WAF");
    }

    #[test]
    fn test_imperva_via_custom_header() {
        let resp = response_with(&[("X-Iinfo", "some-value")], &[]);
        assert_eq!(detect_waf(&resp), "Imperva");
    }

    #[test]
    fn test_f5_via_cookie() {
        let resp = response_with(&[], &["BIGipServer_pool"]);
        assert_eq!(detect_waf(&resp), "F5 BigIP");
    }

    #[test]
    fn test_akamai_and_sucuri() {
        assert_eq!(
            detect_waf(&response_with(&[("Server", "AkamaiGHost")], &[])),
            "Akamai"
        );
        assert_eq!(
            detect_waf(&response_with(&[("Server", "Sucuri/Cloudproxy")], &[])),
            "Sucuri"
        );
    }

    #[test]
    fn test_no_waf() {
        let resp = response_with(&[("Server", "nginx")], &[]);
        assert_eq!(detect_waf(&resp), "");

        let resp = response_with(&[], &[]);
        assert_eq!(detect_waf(&resp), "");
    }

    #[test]
    fn test_body_detection() {
        assert_eq!(
            detect_waf_from_body("<title>Attention Required</title>"),
            "Cloudflare"
        );
        assert_eq!(
            detect_waf_from_body("Access Denied - your request was blocked"),
            "Generic WAF"
        );
        assert_eq!(detect_waf_from_body("<html><body>Hello</body></html>"), "");
    }
}
