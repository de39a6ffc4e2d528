//! Engine configuration.
//!
//! Everything site-specific lives here: button-text dictionaries, candidate
//! role sets, page heuristics and timing. The engine takes a config at
//! construction, so test suites inject deterministic fixtures instead of
//! real timeouts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All waits and delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Bounded wait for a step's primary target.
    pub step_ms: u64,
    /// Bounded wait for a step's fallback target after a primary miss.
    pub fallback_ms: u64,
    /// Settle delay after each action, letting the tree start reacting
    /// before the next step observes it.
    pub settle_ms: u64,
    /// Bounded wait for the success notice, distinct from the step wait.
    pub notice_ms: u64,
    /// Fixed delay granted to the external agent filling credential
    /// fields. Autofill timing is unobservable, so this is not event
    /// driven.
    pub credential_wait_ms: u64,
    /// Bounded wait for the OTP dialog after submitting credentials.
    pub otp_dialog_ms: u64,
    /// Interval of the OTP entry poll.
    pub otp_poll_ms: u64,
    /// Hard ceiling on the OTP entry poll.
    pub otp_ceiling_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            step_ms: 10_000,
            fallback_ms: 2_500,
            settle_ms: 500,
            notice_ms: 3_000,
            credential_wait_ms: 3_000,
            otp_dialog_ms: 5_000,
            otp_poll_ms: 500,
            otp_ceiling_ms: 60_000,
        }
    }
}

impl Timeouts {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn notice(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }
    pub fn credential_wait(&self) -> Duration {
        Duration::from_millis(self.credential_wait_ms)
    }
    pub fn otp_dialog(&self) -> Duration {
        Duration::from_millis(self.otp_dialog_ms)
    }
    pub fn otp_poll(&self) -> Duration {
        Duration::from_millis(self.otp_poll_ms)
    }
    pub fn otp_ceiling(&self) -> Duration {
        Duration::from_millis(self.otp_ceiling_ms)
    }
}

/// Acceptable control labels, per control kind. Defaults carry the site's
/// Chinese labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDictionary {
    /// Submit control of the access-code prompt.
    pub access_code_submit: Vec<String>,
    /// Texts identifying the access-code prompt container itself.
    pub access_code_prompt: Vec<String>,
    /// The hover-revealed one-click save control.
    pub quick_save: Vec<String>,
    /// The control hovered to reveal the one-click save control.
    pub save_entry: Vec<String>,
    /// The generic save control, used when no quick-save path exists.
    pub save: Vec<String>,
    /// A named recent-folder entry in the destination dialog.
    pub recent_folder: Vec<String>,
    /// The "use last path" checkbox label.
    pub use_last_path: Vec<String>,
    /// The destination confirm control.
    pub confirm: Vec<String>,
    /// Dismissal control of the success notice.
    pub notice_dismiss: Vec<String>,
    /// Control switching the login form into credential mode.
    pub login_mode_switch: Vec<String>,
    /// The credential submit control.
    pub login_submit: Vec<String>,
    /// The "send code" control of the SMS dialog.
    pub send_code: Vec<String>,
    /// The submit control accepting the entered one-time code.
    pub otp_submit: Vec<String>,
}

impl Default for TextDictionary {
    fn default() -> Self {
        Self {
            access_code_submit: texts(&["提交", "确定"]),
            access_code_prompt: texts(&["提取码", "访问码"]),
            quick_save: texts(&["一键转存"]),
            save_entry: texts(&["转存"]),
            save: texts(&["转存", "保存到网盘"]),
            recent_folder: texts(&["最近使用"]),
            use_last_path: texts(&["保存到上次路径"]),
            confirm: texts(&["立即转存", "确定转存"]),
            notice_dismiss: texts(&["知道了", "关闭"]),
            login_mode_switch: texts(&["账号登录"]),
            login_submit: texts(&["登录"]),
            send_code: texts(&["获取验证码", "发送验证码"]),
            otp_submit: texts(&["确定", "登录"]),
        }
    }
}

fn texts(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Candidate role sets per control kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSets {
    /// Clickable controls.
    pub controls: Vec<String>,
    /// Binary toggle controls.
    pub toggles: Vec<String>,
    /// Text entry fields.
    pub inputs: Vec<String>,
    /// Modal containers.
    pub dialogs: Vec<String>,
    /// Containers that can hold the access-code prompt.
    pub forms: Vec<String>,
}

impl Default for RoleSets {
    fn default() -> Self {
        Self {
            controls: texts(&["link", "button"]),
            toggles: texts(&["checkbox"]),
            inputs: texts(&["input", "textfield"]),
            dialogs: texts(&["dialog"]),
            forms: texts(&["form", "dialog"]),
        }
    }
}

/// URL heuristics for page classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRules {
    /// Path prefix of share/save pages.
    pub save_path_prefix: String,
    /// Path prefix of the login page.
    pub login_path_prefix: String,
    /// Paths of the generic post-login landing page.
    pub landing_paths: Vec<String>,
}

impl Default for PageRules {
    fn default() -> Self {
        Self {
            save_path_prefix: "/s/".to_string(),
            login_path_prefix: "/login".to_string(),
            landing_paths: texts(&["/", "/home"]),
        }
    }
}

/// Login-form specifics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRules {
    /// Query parameter carrying the post-login redirect target.
    pub goto_param: String,
    /// `name` attributes of the credential fields. Used both to detect a
    /// login form and to exclude these fields from the OTP input search.
    pub credential_fields: Vec<String>,
    /// Minimum entered length at which the one-time code counts as
    /// complete.
    pub min_otp_len: usize,
}

impl Default for LoginRules {
    fn default() -> Self {
        Self {
            goto_param: "goto".to_string(),
            credential_fields: texts(&["account", "password"]),
            min_otp_len: 4,
        }
    }
}

/// Complete engine configuration with documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeouts: Timeouts,
    pub texts: TextDictionary,
    pub roles: RoleSets,
    pub pages: PageRules,
    pub login: LoginRules,
    /// Durable-store key of the pending-redirect slot.
    pub redirect_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            texts: TextDictionary::default(),
            roles: RoleSets::default(),
            pages: PageRules::default(),
            login: LoginRules::default(),
            redirect_key: "saveflow.pending_redirect".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
