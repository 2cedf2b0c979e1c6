//! Integration tests for the message parser.

#![allow(clippy::unwrap_used)]

use popledger_mime::{BodyPart, Payload, parse};
use proptest::prelude::*;

fn leaf_text(part: &BodyPart) -> Option<&str> {
    part.data().and_then(Payload::as_text)
}

#[test]
fn newsletter_with_alternative_and_attachment() {
    let raw = concat!(
        "Return-Path: <news@example.org>\r\n",
        "From: =?iso-8859-1?Q?Caf=E9_News?= <news@example.org>\r\n",
        "To: reader@example.com\r\n",
        "Subject: =?utf-8?B?V2Vla2x5IGRpZ2VzdA==?=\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed;\r\n",
        "\tboundary=\"==outer==\"\r\n",
        "\r\n",
        "This is a multi-part message in MIME format.\r\n",
        "--==outer==\r\n",
        "Content-Type: multipart/alternative; boundary=alt\r\n",
        "\r\n",
        "--alt\r\n",
        "Content-Type: text/plain; charset=windows-1252\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "=93Hello=94 readers=\r\n",
        "!\r\n",
        "--alt\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>Hello readers!</p>\r\n",
        "--alt--\r\n",
        "--==outer==\r\n",
        "Content-Type: application/pdf; name=\"issue.pdf\"\r\n",
        "Content-Disposition: attachment; filename=\"issue.pdf\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "JVBERi0x\r\n",
        "LjQK\r\n",
        "--==outer==--\r\n",
    );

    let message = parse(raw.as_bytes());

    assert_eq!(message.from(), Some("Café News <news@example.org>"));
    assert_eq!(message.subject(), Some("Weekly digest"));
    assert_eq!(message.body.len(), 2);

    let alternative = &message.body[0];
    assert_eq!(alternative.parts().len(), 2);
    assert_eq!(
        leaf_text(&alternative.parts()[0]),
        Some("\u{201C}Hello\u{201D} readers!")
    );
    assert_eq!(leaf_text(&alternative.parts()[1]), Some("<p>Hello readers!</p>"));

    let attachment = &message.body[1];
    assert_eq!(
        attachment.data(),
        Some(&Payload::Binary(b"%PDF-1.4\n".to_vec()))
    );
    assert_eq!(attachment.content_type().sub_type, "pdf");
}

#[test]
fn header_only_message() {
    let message = parse(b"Subject: nothing else\r\n");
    assert_eq!(message.subject(), Some("nothing else"));
    assert_eq!(message.body.len(), 1);
    assert_eq!(leaf_text(&message.body[0]), Some(""));
}

#[test]
fn body_without_headers() {
    let message = parse(b"\r\njust a body\r\n");
    assert!(message.headers.is_empty());
    assert_eq!(leaf_text(&message.body[0]), Some("just a body\r\n"));
}

#[test]
fn truncated_multipart_keeps_what_arrived() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=cut\r\n",
        "\r\n",
        "--cut\r\n",
        "\r\n",
        "first\r\n",
        "--cut\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "second, never closed",
    );
    let message = parse(raw.as_bytes());

    assert_eq!(message.body.len(), 2);
    assert_eq!(leaf_text(&message.body[0]), Some("first"));
    assert_eq!(leaf_text(&message.body[1]), Some("second, never closed"));
}

#[test]
fn japanese_mail_decodes_headers_and_body() {
    let raw = concat!(
        "From: =?ISO-2022-JP?B?GyRCJUYlOSVIGyhC?= <test@example.jp>\r\n",
        "Subject: =?ISO-2022-JP?B?GyRCJUYlOSVIGyhC?=\r\n",
        "Content-Type: multipart/mixed; boundary=jp\r\n",
        "\r\n",
        "--jp\r\n",
        "Content-Type: text/plain; charset=ISO-2022-JP\r\n",
        "Content-Transfer-Encoding: 7bit\r\n",
        "\r\n",
        "\x1b$B%F%9%H\x1b(B\r\n",
        "--jp\r\n",
        "Content-Type: text/plain; charset=Shift_JIS\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "g2WDWINn\r\n",
        "--jp--\r\n",
    );
    let message = parse(raw.as_bytes());

    assert_eq!(message.subject(), Some("テスト"));
    assert_eq!(message.from(), Some("テスト <test@example.jp>"));
    assert_eq!(leaf_text(&message.body[0]), Some("テスト"));
    assert_eq!(leaf_text(&message.body[1]), Some("テスト"));
}

proptest! {
    #[test]
    fn parse_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let message = parse(&raw);
        prop_assert!(!message.body.is_empty());
    }

    #[test]
    fn parse_never_panics_on_mime_like_input(
        boundary in "[a-zA-Z0-9]{1,12}",
        parts in proptest::collection::vec("[ -~\r\n]{0,80}", 0..5),
        close in any::<bool>(),
    ) {
        let mut raw = format!("Content-Type: multipart/mixed; boundary={boundary}\r\n\r\n");
        for part in &parts {
            raw.push_str(&format!("--{boundary}\r\n{part}\r\n"));
        }
        if close {
            raw.push_str(&format!("--{boundary}--\r\n"));
        }

        let message = parse(raw.as_bytes());
        prop_assert!(!message.body.is_empty());
    }

    #[test]
    fn single_part_text_is_preserved(body in "[a-zA-Z0-9 .,!?]{0,200}") {
        let raw = format!("Subject: t\r\n\r\n{body}");
        let message = parse(raw.as_bytes());
        prop_assert_eq!(message.body.len(), 1);
        prop_assert_eq!(leaf_text(&message.body[0]), Some(body.as_str()));
    }
}
