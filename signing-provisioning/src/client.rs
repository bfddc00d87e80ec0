// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [ProvisioningClient]: the C6 free-tier developer-services client.

use crate::ProvisioningError;
use ipasign_auth::AppleSession;
use ipasign_core::{build_csr, generate_rsa_keypair, parse_profile, parse_x509_der};
use ipasign_identity::{validate_udid, Certificate, CertificateVariant, ProvisioningProfile};
use log::{info, warn};
use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

const QH65B2_URL: &str = "https://developerservices2.apple.com/services/QH65B2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A team returned by `listTeams`, per spec §4.6.
#[derive(Clone, Debug)]
pub struct Team {
    pub team_id: String,
    pub name: String,
}

/// Configuration for a [ProvisioningClient].
#[derive(Clone, Debug)]
pub struct ProvisioningClientConfig {
    pub timeout: Duration,
}

impl Default for ProvisioningClientConfig {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Client for Apple's free-tier developer-services API, bound to one
/// authenticated [AppleSession].
///
/// All operations require the session's team id; per spec §4.6 this is
/// "the first team returned from `listTeams`", resolved lazily by
/// [Self::team_id] and cached for the client's lifetime.
pub struct ProvisioningClient {
    http: reqwest::blocking::Client,
    /// Holds the authenticated session's `team_id` field too: once resolved
    /// (see [Self::team_id]), it's written back onto the session rather than
    /// tracked separately, matching `AppleSession::team_id`'s doc comment.
    session: Mutex<AppleSession>,
    config: ProvisioningClientConfig,
    /// Stable per-instance machine id sent with every CSR submission,
    /// mirroring the prototype's `AppleAuthenticator._device_id` rather
    /// than generating a fresh one per call.
    machine_id: uuid::Uuid,
    app_ids: Mutex<HashMap<String, String>>,
    registered_devices: Mutex<HashSet<String>>,
    cancelled: AtomicBool,
}

impl ProvisioningClient {
    pub fn new(session: AppleSession, config: ProvisioningClientConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            session: Mutex::new(session),
            config,
            machine_id: uuid::Uuid::new_v4(),
            app_ids: Mutex::new(HashMap::new()),
            registered_devices: Mutex::new(HashSet::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn abort(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> Result<(), ProvisioningError> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(ProvisioningError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn with_retry<T>(
        &self,
        mut f: impl FnMut() -> Result<T, ProvisioningError>,
    ) -> Result<T, ProvisioningError> {
        let mut attempt = 0;
        loop {
            self.check_cancelled()?;

            match f() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!("retrying after transient error (attempt {attempt}): {e}");
                    std::thread::sleep(RETRY_BACKOFF * 2u32.pow(attempt - 1));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// List development teams for the authenticated Apple ID.
    pub fn list_teams(&self) -> Result<Vec<Team>, ProvisioningError> {
        let response = self.raw_request("listTeams", plist::Dictionary::new())?;

        let teams = response
            .get("teams")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(teams
            .iter()
            .filter_map(|v| v.as_dictionary())
            .map(|d| Team {
                team_id: dict_string(d, "teamId"),
                name: dict_string(d, "name"),
            })
            .collect())
    }

    /// Resolve (and cache) the team id to operate as, per spec §4.6: the
    /// first team returned by `listTeams`.
    pub fn team_id(&self) -> Result<String, ProvisioningError> {
        if let Some(id) = self.session.lock().unwrap().team_id.clone() {
            return Ok(id);
        }

        let teams = self.list_teams()?;
        let first = teams
            .into_iter()
            .next()
            .ok_or(ProvisioningError::SessionExpired)?;

        self.session.lock().unwrap().team_id = Some(first.team_id.clone());
        Ok(first.team_id)
    }

    /// List development certificates registered to the team.
    pub fn list_certificates(&self) -> Result<Vec<Certificate>, ProvisioningError> {
        let response = self.dev_request("listAllDevelopmentCerts", plist::Dictionary::new())?;

        let certs = response
            .get("certRequests")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        certs
            .iter()
            .filter_map(|v| v.as_dictionary())
            .filter_map(|d| d.get("certContent").and_then(|v| v.as_data()))
            .map(|der| self.certificate_from_der(der))
            .collect()
    }

    /// Generate a new RSA keypair and CSR in C1, submit it to Apple, and
    /// return the resulting [Certificate] (private key attached), per spec
    /// §4.6 `create_certificate`.
    pub fn create_certificate(&self) -> Result<Certificate, ProvisioningError> {
        info!("creating development certificate");

        let key = generate_rsa_keypair(2048)?;
        let csr_pem = build_csr(&key, "iOS Development")?;

        let mut params = plist::Dictionary::new();
        params.insert(
            "csrContent".to_string(),
            plist::Value::String(String::from_utf8_lossy(&csr_pem).to_string()),
        );
        params.insert(
            "machineId".to_string(),
            plist::Value::String(self.machine_id.to_string().to_uppercase()),
        );
        params.insert(
            "machineName".to_string(),
            plist::Value::String("ipasign".to_string()),
        );

        let response = self
            .dev_request("submitDevelopmentCSR", params)
            .map_err(|e| reclassify_quota_error(e, QuotaKind::Certificate))?;

        let cert_dict = response
            .get("certRequest")
            .and_then(|v| v.as_dictionary())
            .ok_or_else(|| ProvisioningError::CsrRejected("no certRequest in response".into()))?;

        let der = cert_dict
            .get("certContent")
            .and_then(|v| v.as_data())
            .ok_or_else(|| ProvisioningError::CsrRejected("no certContent in response".into()))?;

        let mut cert = self.certificate_from_der(der)?;

        let pem = ipasign_core_pkcs8_pem(&key)?;
        cert.private_key_pem = Some(pem);
        cert.variant = CertificateVariant::Free;

        Ok(cert)
    }

    /// Revoke a certificate previously minted through [Self::create_certificate].
    pub fn revoke_certificate(&self, serial_number: &str) -> Result<(), ProvisioningError> {
        let mut params = plist::Dictionary::new();
        params.insert(
            "serialNumber".to_string(),
            plist::Value::String(serial_number.to_string()),
        );

        self.dev_request("revokeDevelopmentCert", params)?;
        Ok(())
    }

    /// List application identifiers registered to the team.
    pub fn list_app_ids(&self) -> Result<Vec<(String, String)>, ProvisioningError> {
        let response = self.dev_request("listAppIds", plist::Dictionary::new())?;

        let app_ids = response
            .get("appIds")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(app_ids
            .iter()
            .filter_map(|v| v.as_dictionary())
            .map(|d| (dict_string(d, "identifier"), dict_string(d, "appIdId")))
            .collect())
    }

    /// Register an app id for `bundle_id`, creating it if it doesn't
    /// already exist. Memoizes bundle_id -> Apple-assigned app-id-id for
    /// the life of this client, per the prototype's `_app_ids` cache.
    pub fn register_app_id(
        &self,
        bundle_id: &str,
        name: Option<&str>,
    ) -> Result<String, ProvisioningError> {
        if let Some(existing) = self.app_ids.lock().unwrap().get(bundle_id).cloned() {
            return Ok(existing);
        }

        if bundle_id.is_empty() || bundle_id.contains(' ') {
            return Err(ProvisioningError::InvalidBundleId(bundle_id.to_string()));
        }

        for (identifier, app_id_id) in self.list_app_ids()? {
            if identifier == bundle_id {
                self.app_ids
                    .lock()
                    .unwrap()
                    .insert(bundle_id.to_string(), app_id_id.clone());
                return Ok(app_id_id);
            }
        }

        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| bundle_id.rsplit('.').next().unwrap_or(bundle_id).to_string());

        let mut params = plist::Dictionary::new();
        params.insert(
            "identifier".to_string(),
            plist::Value::String(bundle_id.to_string()),
        );
        params.insert("name".to_string(), plist::Value::String(name));
        params.insert(
            "enabledFeatures".to_string(),
            plist::Value::Dictionary(plist::Dictionary::new()),
        );

        let response = self
            .dev_request("addAppId", params)
            .map_err(|e| reclassify_quota_error(e, QuotaKind::AppId))?;

        let app_id_id = response
            .get("appId")
            .and_then(|v| v.as_dictionary())
            .map(|d| dict_string(d, "appIdId"))
            .ok_or_else(|| ProvisioningError::InvalidBundleId(bundle_id.to_string()))?;

        self.app_ids
            .lock()
            .unwrap()
            .insert(bundle_id.to_string(), app_id_id.clone());

        Ok(app_id_id)
    }

    /// Register a device UDID, validating it per spec §4.6/§8 property 8.
    /// A second call with the same UDID produces zero network traffic.
    pub fn register_device(&self, udid: &str, name: Option<&str>) -> Result<(), ProvisioningError> {
        let udid = udid.trim().to_uppercase();
        validate_udid(&udid).map_err(|e| ProvisioningError::InvalidUdid(e.to_string()))?;

        if self.registered_devices.lock().unwrap().contains(&udid) {
            return Ok(());
        }

        for existing in self.list_devices()? {
            if existing.eq_ignore_ascii_case(&udid) {
                self.registered_devices.lock().unwrap().insert(udid);
                return Ok(());
            }
        }

        let mut params = plist::Dictionary::new();
        params.insert(
            "deviceNumber".to_string(),
            plist::Value::String(udid.clone()),
        );
        params.insert(
            "name".to_string(),
            plist::Value::String(name.unwrap_or("iOS Device").to_string()),
        );

        self.dev_request("addDevice", params)
            .map_err(|e| reclassify_quota_error(e, QuotaKind::Device))?;
        self.registered_devices.lock().unwrap().insert(udid);

        Ok(())
    }

    fn list_devices(&self) -> Result<Vec<String>, ProvisioningError> {
        let response = self.dev_request("listDevices", plist::Dictionary::new())?;

        let devices = response
            .get("devices")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(devices
            .iter()
            .filter_map(|v| v.as_dictionary())
            .map(|d| dict_string(d, "deviceNumber"))
            .collect())
    }

    /// Ensure the device and app id exist, then download and parse the
    /// team provisioning profile for `bundle_id`, per spec §4.6
    /// `create_profile`.
    pub fn create_profile(
        &self,
        bundle_id: &str,
        device_udid: &str,
        _certificate: &Certificate,
    ) -> Result<ProvisioningProfile, ProvisioningError> {
        self.register_device(device_udid, None)?;
        let app_id = self.register_app_id(bundle_id, None)?;

        let mut params = plist::Dictionary::new();
        params.insert("appIdId".to_string(), plist::Value::String(app_id));

        let response = self.dev_request("downloadTeamProvisioningProfile", params)?;

        let profile_bytes = response
            .get("provisioningProfile")
            .and_then(|v| v.as_dictionary())
            .and_then(|d| d.get("encodedProfile"))
            .and_then(|v| v.as_data())
            .ok_or_else(|| {
                ProvisioningError::ProfileCreationFailed("no profile in response".into())
            })?;

        parse_profile(profile_bytes)
            .map_err(|e| ProvisioningError::ProfileCreationFailed(e.to_string()))
    }

    fn certificate_from_der(&self, der: &[u8]) -> Result<Certificate, ProvisioningError> {
        let mut cert = parse_x509_der(der)?;
        if cert.team_id.is_none() {
            cert.team_id = self.session.lock().unwrap().team_id.clone();
        }
        Ok(cert)
    }

    /// A request to the `QH65B2` developer-services endpoint, automatically
    /// including `teamId` and retrying transient failures.
    fn dev_request(
        &self,
        path: &str,
        params: plist::Dictionary,
    ) -> Result<plist::Dictionary, ProvisioningError> {
        let team_id = self.team_id()?;
        let mut body = params;
        body.insert("teamId".to_string(), plist::Value::String(team_id));
        self.raw_request(path, body)
    }

    fn raw_request(
        &self,
        path: &str,
        body: plist::Dictionary,
    ) -> Result<plist::Dictionary, ProvisioningError> {
        self.check_cancelled()?;

        let mut buf = Vec::new();
        plist::Value::Dictionary(body)
            .to_writer_xml(&mut buf)
            .map_err(ProvisioningError::from)?;

        let url = format!("{QH65B2_URL}/{path}");

        let response = self.with_retry(|| {
            self.session
                .lock()
                .unwrap()
                .authorize(&self.http, reqwest::Method::POST, &url)
                .header("Content-Type", "text/x-xml-plist")
                .header("Accept", "text/x-xml-plist")
                .timeout(self.config.timeout)
                .body(buf.clone())
                .send()
                .map_err(ProvisioningError::from)
        })?;

        match response.status().as_u16() {
            200 => {
                let bytes = response.bytes()?;
                if bytes.is_empty() {
                    return Ok(plist::Dictionary::new());
                }
                let value = plist::Value::from_reader_xml(Cursor::new(bytes.as_ref()))?;
                Ok(value.into_dictionary().unwrap_or_default())
            }
            503 => Err(ProvisioningError::ServiceUnavailable),
            status => Err(ProvisioningError::ApiError {
                status,
                detail: response.text().unwrap_or_default(),
            }),
        }
    }
}

/// Which quota a failed creation call against, used to pick the right
/// typed error out of Apple's free-text `userString`/`resultString`.
enum QuotaKind {
    Certificate,
    AppId,
    Device,
}

/// Apple reports quota exhaustion as free text on an otherwise generic
/// error response rather than a distinguishable status code or resultCode
/// (spec §9: "Apple does not return quota-remaining metadata on success").
/// Recognize the wording Apple's real developer-services API uses for each
/// creation call and promote a generic [ProvisioningError::ApiError] into
/// the matching named variant so callers get accurate guidance; anything
/// that doesn't match the known phrasing passes through unchanged.
fn reclassify_quota_error(err: ProvisioningError, kind: QuotaKind) -> ProvisioningError {
    let ProvisioningError::ApiError { detail, .. } = &err else {
        return err;
    };

    let lower = detail.to_lowercase();
    match kind {
        QuotaKind::Certificate
            if lower.contains("maximum number of certificates")
                || lower.contains("maximum allowed number of certificates") =>
        {
            ProvisioningError::CertQuotaExceeded(detail.clone())
        }
        QuotaKind::AppId if lower.contains("maximum number of app ids") => {
            ProvisioningError::AppIdQuotaExceeded(detail.clone())
        }
        QuotaKind::Device if lower.contains("maximum number of devices") => {
            ProvisioningError::DeviceQuotaExceeded(detail.clone())
        }
        _ => err,
    }
}

fn dict_string(dict: &plist::Dictionary, key: &str) -> String {
    dict.get(key)
        .and_then(|v| v.as_string())
        .unwrap_or_default()
        .to_string()
}

fn ipasign_core_pkcs8_pem(
    key: &ipasign_core::InMemoryRsaKey,
) -> Result<String, ProvisioningError> {
    use pkcs8::EncodePrivateKey;
    let der = key
        .to_pkcs8_der()
        .map_err(|e| ProvisioningError::CsrRejected(e.to_string()))?;
    Ok(pem::encode(&pem::Pem {
        tag: "PRIVATE KEY".to_string(),
        contents: der.as_der().to_vec(),
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    fn api_error(detail: &str) -> ProvisioningError {
        ProvisioningError::ApiError {
            status: 200,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn reclassifies_known_certificate_quota_wording() {
        let err = reclassify_quota_error(
            api_error("You have reached the maximum number of certificates for this account."),
            QuotaKind::Certificate,
        );
        assert!(matches!(err, ProvisioningError::CertQuotaExceeded(_)));
    }

    #[test]
    fn reclassifies_known_app_id_quota_wording() {
        let err = reclassify_quota_error(
            api_error("You have reached the maximum number of App IDs for this team."),
            QuotaKind::AppId,
        );
        assert!(matches!(err, ProvisioningError::AppIdQuotaExceeded(_)));
    }

    #[test]
    fn reclassifies_known_device_quota_wording() {
        let err = reclassify_quota_error(
            api_error("You have reached the maximum number of devices of this type for your team."),
            QuotaKind::Device,
        );
        assert!(matches!(err, ProvisioningError::DeviceQuotaExceeded(_)));
    }

    #[test]
    fn leaves_unrecognized_errors_untouched() {
        let err = reclassify_quota_error(api_error("some other failure"), QuotaKind::Certificate);
        assert!(matches!(err, ProvisioningError::ApiError { .. }));
    }
}
