//! Mail composition from row data and delivery parameters. Pure, no I/O.

use sheetmail_types::{Attachment, ComposedMessage, DeliveryParams};

/// Row fields interpolated into the subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFields<'a> {
    pub identifier: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub year: &'a str,
    pub month: &'a str,
}

impl<'a> MessageFields<'a> {
    pub fn new(identifier: &'a str, name: &'a str, category: &'a str, params: &'a DeliveryParams) -> Self {
        Self {
            identifier,
            name,
            category,
            year: &params.year,
            month: &params.month,
        }
    }
}

pub fn subject(fields: &MessageFields<'_>) -> String {
    format!("Healthcare - PAD de {} {}/{}", fields.name, fields.year, fields.month)
}

pub fn text_body(fields: &MessageFields<'_>) -> String {
    format!(
        "Olá,\n\nSegue em anexo os documentos de {name}.\n\nCOD: {id}\nPAD: {category}\nPeríodo: {month}/{year}\n\nAtenciosamente,\nEquipe Health Care",
        name = fields.name,
        id = fields.identifier,
        category = fields.category,
        month = fields.month,
        year = fields.year,
    )
}

/// The text body with line breaks as `<br>`; no other markup.
pub fn html_body(text: &str) -> String {
    text.replace('\n', "<br>")
}

pub fn compose(to: &str, fields: &MessageFields<'_>, attachments: Vec<Attachment>) -> ComposedMessage {
    let text = text_body(fields);
    ComposedMessage {
        to: to.to_string(),
        subject: subject(fields),
        html: html_body(&text),
        text,
        attachments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DeliveryParams {
        DeliveryParams {
            to: "destino@example.com".into(),
            year: "2025".into(),
            month: "06".into(),
        }
    }

    fn attachment(name: &str) -> Attachment {
        Attachment {
            filename: name.into(),
            content_type: "application/pdf".into(),
            content: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn subject_and_body_interpolate_fields() {
        let p = params();
        let fields = MessageFields::new("7", "Ana", "12 H", &p);
        let msg = compose(&p.to, &fields, vec![]);
        assert_eq!(msg.subject, "Healthcare - PAD de Ana 2025/06");
        assert_eq!(
            msg.text,
            "Olá,\n\nSegue em anexo os documentos de Ana.\n\nCOD: 7\nPAD: 12 H\nPeríodo: 06/2025\n\nAtenciosamente,\nEquipe Health Care"
        );
        assert_eq!(msg.to, "destino@example.com");
    }

    #[test]
    fn html_only_swaps_newlines() {
        let p = params();
        let msg = compose(&p.to, &MessageFields::new("7", "<Ana>", "24 H", &p), vec![]);
        assert!(!msg.html.contains('\n'));
        assert_eq!(msg.html.matches("<br>").count(), msg.text.matches('\n').count());
        assert!(msg.html.contains("<Ana>"));
    }

    #[test]
    fn attachments_keep_given_order() {
        let p = params();
        let msg = compose(
            &p.to,
            &MessageFields::new("1", "Bia", "ASSISTENCIA 2 - FISIO / FONO", &p),
            vec![attachment("FISIO.pdf"), attachment("FONO.pdf")],
        );
        let names: Vec<_> = msg.attachments.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["FISIO.pdf", "FONO.pdf"]);
    }
}
