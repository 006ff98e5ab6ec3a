use envconfig::Envconfig;

use crate::crd::PaasConfigSpec;

#[derive(Envconfig, Clone, Debug)]
pub struct CrmConfig {
    #[envconfig(from = "PAAS_CRM_PROFILE", default = "dev")]
    pub profile: String,

    #[envconfig(from = "HTTP_PORT", default = "8088")]
    pub http_port: u16,

    /// Name of the PaasConfig resource holding the operator defaults.
    /// Env: PAAS_CRM_CONFIG_NAME
    #[envconfig(from = "PAAS_CRM_CONFIG_NAME", default = "paas-config")]
    pub config_name: String,

    #[envconfig(from = "PAAS_CRM_FIELD_MANAGER", default = "paas-crm")]
    pub field_manager: String,

    /// Requeue interval after a successful pass, in seconds.
    #[envconfig(from = "PAAS_CRM_REQUEUE_SECS", default = "300")]
    pub requeue_secs: u64,

    /// Requeue interval after a failed pass, in seconds.
    #[envconfig(from = "PAAS_CRM_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    #[envconfig(nested)]
    pub features: FeaturesConfig,

    #[envconfig(nested)]
    pub bootstrap: BootstrapDefaults,
}

#[derive(Envconfig, Clone, Debug, Default)]
pub struct FeaturesConfig {
    /// If Some, env explicitly set; otherwise, profile defaults apply
    #[envconfig(from = "PAAS_CRM_FEATURES_CONFIG_WATCH")]
    pub config_watch: Option<bool>,
    #[envconfig(from = "PAAS_CRM_FEATURES_EVENTS")]
    pub events: Option<bool>,
    #[envconfig(from = "PAAS_CRM_FEATURES_HTTP")]
    pub http: Option<bool>,
}

/// Defaults in effect until a PaasConfig has been observed.
#[derive(Envconfig, Clone, Debug)]
pub struct BootstrapDefaults {
    #[envconfig(from = "PAAS_CRM_QUOTA_LABEL", default = "clusterquotagroup")]
    pub quota_label: String,
    #[envconfig(from = "PAAS_CRM_REQUESTOR_LABEL", default = "requestor")]
    pub requestor_label: String,
    #[envconfig(from = "PAAS_CRM_ARGO_NAMESPACE", default = "argocd")]
    pub argo_namespace: String,
}

impl CrmConfig {
    /// Apply profile → defaults mapping, while respecting explicit env overrides.
    ///
    /// - dev:  config_watch=true, events=false, http=true
    /// - prod: config_watch=true, events=true,  http=true
    pub fn apply_profile_defaults(mut self) -> Self {
        let (def_watch, def_events, def_http) = match self.profile.as_str() {
            "prod" | "production" => (true, true, true),
            _ /* dev */ => (true, false, true),
        };

        if self.features.config_watch.is_none() {
            self.features.config_watch = Some(def_watch);
        }
        if self.features.events.is_none() {
            self.features.events = Some(def_events);
        }
        if self.features.http.is_none() {
            self.features.http = Some(def_http);
        }
        self
    }

    pub fn config_watch_enabled(&self) -> bool {
        self.features.config_watch.unwrap_or(true)
    }

    pub fn events_enabled(&self) -> bool {
        self.features.events.unwrap_or(false)
    }

    pub fn http_enabled(&self) -> bool {
        self.features.http.unwrap_or(true)
    }
}

impl BootstrapDefaults {
    pub fn to_spec(&self) -> PaasConfigSpec {
        PaasConfigSpec {
            quota_label: self.quota_label.clone(),
            requestor_label: self.requestor_label.clone(),
            argo_namespace: self.argo_namespace.clone(),
            ..Default::default()
        }
    }
}
