//! Metadata record construction

use credify_core::{
    Attribute, CredifyError, MetadataFile, MetadataProperties, MetadataRecord, StudentRecord,
};

pub const CREDENTIAL_CATEGORY: &str = "credential";

/// Builds the metadata record uploaded for each credential.
///
/// Pure: no I/O and no clock. Certificate ids that the input does not
/// supply are derived from the student and the builder's uniqueness token.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    institution: String,
    symbol: String,
    verify_base_url: String,
    token: String,
}

impl MetadataBuilder {
    pub fn new(
        institution: impl Into<String>,
        symbol: impl Into<String>,
        verify_base_url: impl Into<String>,
    ) -> Self {
        Self {
            institution: institution.into(),
            symbol: symbol.into(),
            verify_base_url: verify_base_url.into(),
            token: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
        }
    }

    /// Same builder with a fixed uniqueness token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// First word of the institution name, e.g. `APEC`
    pub fn short_institution(&self) -> &str {
        self.institution
            .split_whitespace()
            .next()
            .unwrap_or(self.institution.as_str())
    }

    /// Prefix of generated certificate ids: the symbol up to its first `-`
    pub fn id_prefix(&self) -> &str {
        self.symbol.split('-').next().unwrap_or(self.symbol.as_str())
    }

    /// The student's certificate id, or a generated
    /// `<prefix>-<email local part | dashed name>-<token>`
    pub fn certificate_id(&self, student: &StudentRecord) -> String {
        if let Some(id) = student.certificate_id.as_deref().map(str::trim) {
            if !id.is_empty() {
                return id.to_string();
            }
        }

        let local = student
            .email
            .trim()
            .split('@')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| student.name.split_whitespace().collect::<Vec<_>>().join("-"));

        format!("{}-{}-{}", self.id_prefix(), local, self.token)
    }

    pub fn verify_url(&self, certificate_id: &str) -> String {
        format!(
            "{}/verify/{}",
            self.verify_base_url.trim_end_matches('/'),
            certificate_id
        )
    }

    pub fn build(
        &self,
        student: &StudentRecord,
        image_uri: &str,
    ) -> Result<MetadataRecord, CredifyError> {
        if image_uri.trim().is_empty() {
            return Err(CredifyError::validation("image URI required"));
        }
        student.validate_fields()?;

        let certificate_id = self.certificate_id(student);
        let name = student.name.trim();
        let major = student.major.trim();
        let issue_date = student.issue_date.trim();

        let mut attributes = vec![
            Attribute::new("Student Name", name),
            Attribute::new("Major", major),
            Attribute::new("Issue Date", issue_date),
            Attribute::new("Certificate ID", certificate_id.as_str()),
            Attribute::new("Institution", self.institution.as_str()),
        ];
        if !student.email.trim().is_empty() {
            attributes.push(Attribute::new("Email", student.email.trim()));
        }
        attributes.extend(
            student
                .additional_info
                .iter()
                .map(|(k, v)| Attribute::new(k.as_str(), v.as_str())),
        );

        let record = MetadataRecord {
            name: format!("{} Credential: {}", self.short_institution(), name),
            symbol: self.symbol.clone(),
            description: format!(
                "Academic credential certificate for {} in {}, issued by {} on {}.",
                name, major, self.institution, issue_date
            ),
            image: image_uri.to_string(),
            external_url: self.verify_url(&certificate_id),
            attributes,
            properties: MetadataProperties {
                files: vec![MetadataFile {
                    uri: image_uri.to_string(),
                    content_type: "image/png".to_string(),
                }],
                category: Some(CREDENTIAL_CATEGORY.to_string()),
            },
        };

        record.validate()?;
        Ok(record)
    }
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        Self::new("APEC University", "APEC-CRED", "https://apec.edu.vn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "11111111111111111111111111111111";

    fn builder() -> MetadataBuilder {
        MetadataBuilder::default().with_token("t1")
    }

    #[test]
    fn test_attribute_order_and_names() {
        let mut student = StudentRecord::new("Alice", "alice@apec.edu", "CS", "2025-01-15", WALLET);
        student.additional_info.insert("Grade".into(), "A".into());
        student.additional_info.insert("Cohort".into(), "2021".into());

        let record = builder().build(&student, "https://arweave.net/img").unwrap();
        let traits: Vec<_> = record.attributes.iter().map(|a| a.trait_type.as_str()).collect();
        assert_eq!(
            traits,
            vec![
                "Student Name",
                "Major",
                "Issue Date",
                "Certificate ID",
                "Institution",
                "Email",
                "Cohort",
                "Grade"
            ]
        );
        assert_eq!(record.name, "APEC Credential: Alice");
        assert_eq!(
            record.description,
            "Academic credential certificate for Alice in CS, issued by APEC University on 2025-01-15."
        );
        assert_eq!(record.attribute("Certificate ID"), Some("APEC-alice-t1"));
        assert_eq!(record.external_url, "https://apec.edu.vn/verify/APEC-alice-t1");
        assert_eq!(record.properties.files[0].content_type, "image/png");
        assert_eq!(record.properties.category.as_deref(), Some("credential"));
    }

    #[test]
    fn test_empty_image_uri_rejected() {
        let student = StudentRecord::new("Alice", "", "CS", "2025-01-15", WALLET);
        let err = builder().build(&student, "  ").unwrap_err();
        assert_eq!(err, CredifyError::validation("image URI required"));
    }

    #[test]
    fn test_certificate_id_from_name_without_email() {
        let student = StudentRecord::new("Tran  Van An", "", "CS", "2025-01-15", WALLET);
        assert_eq!(builder().certificate_id(&student), "APEC-Tran-Van-An-t1");
    }

    #[test]
    fn test_supplied_certificate_id_kept() {
        let student = StudentRecord::new("Alice", "alice@apec.edu", "CS", "2025-01-15", WALLET)
            .with_certificate_id("CUSTOM-1");
        let record = builder().build(&student, "https://arweave.net/img").unwrap();
        assert_eq!(record.attribute("Certificate ID"), Some("CUSTOM-1"));
        assert!(record.attribute("Email").is_some());
    }

    #[test]
    fn test_same_token_same_id() {
        let student = StudentRecord::new("Alice", "alice@apec.edu", "CS", "2025-01-15", WALLET);
        assert_eq!(
            builder().certificate_id(&student),
            builder().certificate_id(&student)
        );
    }
}
