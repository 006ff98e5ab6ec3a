use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::crd::paas::PaasCapability;
use crate::crd::paas_config::ConfigCapability;
use crate::crd::{Paas, PaasConfigSpec, Quota};
use crate::crypt::Decrypt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub value: String,
    pub detail: String,
}

impl FieldError {
    fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Invalid value: \"{}\": {}",
            self.field, self.value, self.detail
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn allowed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a tenant against the active defaults. Secrets are only checked when
/// a decryptor is supplied.
pub fn validate(
    paas: &Paas,
    config: &PaasConfigSpec,
    decrypt: Option<&dyn Decrypt>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (name, cap) in &paas.spec.capabilities {
        match config.capabilities.get(name) {
            None => report.errors.push(FieldError::new(
                "spec.capabilities",
                name,
                "capability not configured",
            )),
            Some(configured) => {
                check_custom_fields(name, cap, configured, &mut report);
                if cap.extra_permissions && configured.extra_permissions.is_empty()
                {
                    report.warnings.push(format!(
                        "spec.capabilities[{name}].extra_permissions capability does not have extra permissions configured"
                    ));
                }
            }
        }
    }

    check_group_names(paas, config, &mut report);

    if let Some(decrypt) = decrypt {
        check_secrets("spec.sshSecrets", &paas.spec.ssh_secrets, decrypt, &mut report);
        for (name, cap) in &paas.spec.capabilities {
            check_secrets(
                &format!("spec.capabilities[{name}].sshSecrets"),
                &cap.ssh_secrets,
                decrypt,
                &mut report,
            );
        }
    }

    for (name, group) in &paas.spec.groups {
        if !group.users.is_empty() && !group.query.is_empty() {
            report.warnings.push(format!(
                "spec.groups[{name}] contains both users and query, the users will be ignored"
            ));
        }
    }

    check_quota("spec.quota", &paas.spec.quota, &mut report);
    for (name, cap) in &paas.spec.capabilities {
        check_quota(
            &format!("spec.capabilities[{name}].quota"),
            &cap.quota,
            &mut report,
        );
    }

    report
}

fn check_custom_fields(
    name: &str,
    cap: &PaasCapability,
    configured: &ConfigCapability,
    report: &mut ValidationReport,
) {
    let field = format!("spec.capabilities[{name}]");
    let error = |detail: String| FieldError::new(&field, "custom_fields", detail);

    for key in cap.custom_fields.keys() {
        if !configured.custom_fields.contains_key(key) {
            report.errors.push(error(format!(
                "custom field {key} is not configured in capability config"
            )));
        }
    }

    for (key, spec) in &configured.custom_fields {
        let Some(value) = cap.custom_fields.get(key) else {
            if spec.required && spec.default.is_empty() {
                report.errors.push(error(format!("value {key} is required")));
            }
            continue;
        };
        if spec.validation.is_empty() {
            continue;
        }
        match Regex::new(&spec.validation) {
            Ok(re) if re.is_match(value) => {}
            Ok(_) => report.errors.push(error(format!(
                "invalid value {value} (does not match {})",
                spec.validation
            ))),
            Err(e) => report.errors.push(error(format!(
                "validation regex for {key} does not compile: {e}"
            ))),
        }
    }
}

fn check_group_names(
    paas: &Paas,
    config: &PaasConfigSpec,
    report: &mut ValidationReport,
) {
    let Some(pattern) = config.validation("paas", "groupName") else {
        return;
    };
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            report.errors.push(FieldError::new(
                "spec.groups",
                pattern,
                format!("group name validation regex does not compile: {e}"),
            ));
            return;
        }
    };
    for name in paas.spec.groups.keys() {
        if !re.is_match(name) {
            report.errors.push(FieldError::new(
                "spec.groups",
                name,
                "group name does not match configured validation regex",
            ));
        }
    }
}

fn check_secrets(
    field: &str,
    secrets: &BTreeMap<String, String>,
    decrypt: &dyn Decrypt,
    report: &mut ValidationReport,
) {
    for (name, ciphertext) in secrets {
        if let Err(e) = decrypt.decrypt(ciphertext) {
            report.errors.push(FieldError::new(
                field,
                name,
                format!("cannot be decrypted: {e}"),
            ));
        }
    }
}

fn check_quota(field: &str, quota: &Quota, report: &mut ValidationReport) {
    for (resource, label) in [("cpu", "CPU"), ("memory", "memory")] {
        let (Some(request), Some(limit)) = (
            quota.get(&format!("requests.{resource}")),
            quota.get(&format!("limits.{resource}")),
        ) else {
            continue;
        };
        let (Some(r), Some(l)) =
            (parse_quantity(&request.0), parse_quantity(&limit.0))
        else {
            continue;
        };
        if r > l {
            report.warnings.push(format!(
                "{field} {label} resource request ({}) higher than limit ({})",
                request.0, limit.0
            ));
        }
    }
}

/// Numeric value of a Kubernetes quantity such as `500m`, `1Gi` or `2e3`.
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    let s = quantity.trim();
    let split = s
        .char_indices()
        .find(|&(i, c)| {
            let sign = i == 0 && (c == '+' || c == '-');
            !(c.is_ascii_digit() || c == '.' || sign)
        })
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let value: f64 = number.parse().ok()?;

    let binary = |exp: i32| 1024f64.powi(exp);
    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => binary(1),
        "Mi" => binary(2),
        "Gi" => binary(3),
        "Ti" => binary(4),
        "Pi" => binary(5),
        "Ei" => binary(6),
        exp if exp.starts_with(['e', 'E']) => 10f64.powi(exp[1..].parse().ok()?),
        _ => return None,
    };
    Some(value * multiplier)
}
