//! Playwright browser automation
//!
//! The driver builds a Node script per interaction batch, runs it with
//! `node`, and reads back one structured [`PageSnapshot`] from stdout. Every
//! batch ends with the same DOM capture, so the Rust side only ever reasons
//! over snapshots and stays browser-free.

use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::snapshot::PageSnapshot;

/// Marker prefixing the snapshot JSON line on the script's stdout.
const SNAPSHOT_MARKER: &str = "__SNAPSHOT__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> E2eResult<Self> {
        match name.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{other}'"))),
        }
    }
}

/// One browser interaction. A batch of these runs in a single page session.
#[derive(Debug, Clone)]
pub enum UiAction {
    /// Navigate to a path under the device base URL.
    Goto(String),
    /// Set a named `<select>` to a value.
    Select { name: String, value: String },
    /// Check a named radio option.
    CheckRadio { name: String, value: String },
    /// Click an arbitrary selector.
    Click(String),
    /// Fill a named input.
    Fill { name: String, value: String },
    /// Let the device-side form logic settle.
    Settle(Duration),
}

impl UiAction {
    fn describe(&self) -> String {
        match self {
            UiAction::Goto(path) => format!("goto:{path}"),
            UiAction::Select { name, value } => format!("select:{name}={value}"),
            UiAction::CheckRadio { name, value } => format!("radio:{name}={value}"),
            UiAction::Click(selector) => format!("click:{selector}"),
            UiAction::Fill { name, .. } => format!("fill:{name}"),
            UiAction::Settle(d) => format!("settle:{}ms", d.as_millis()),
        }
    }
}

pub struct PlaywrightDriver {
    base_url: String,
    browser: Browser,
    headless: bool,
}

impl PlaywrightDriver {
    pub fn new(base_url: impl Into<String>, browser: Browser, headless: bool) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        Ok(Self {
            base_url: base_url.into(),
            browser,
            headless,
        })
    }

    fn check_playwright_installed() -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Navigate to a page and capture its snapshot.
    pub async fn snapshot(&self, path: &str) -> E2eResult<PageSnapshot> {
        self.run(&[UiAction::Goto(path.to_string())]).await
    }

    /// Run a batch of actions on one page session, then capture the final
    /// state. Navigation must come first or the page is blank.
    pub async fn run(&self, actions: &[UiAction]) -> E2eResult<PageSnapshot> {
        let script = self.build_script(actions);
        self.run_script(&script).await
    }

    /// Build the Node script for a batch of actions plus the DOM capture.
    fn build_script(&self, actions: &[UiAction]) -> String {
        let mut script = format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{ ignoreHTTPSErrors: true }});
  const page = await context.newPage();
  const baseUrl = '{base_url}';

  try {{
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            base_url = js_escape(&self.base_url),
        );

        for action in actions {
            script.push_str(&format!("    // {}\n", action.describe()));
            script.push_str(&self.action_to_js(action));
            script.push('\n');
        }

        script.push_str(&format!(
            r#"
    const snapshot = await page.evaluate(() => {{
      const visible = (el) => {{
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
      }};
      const tables = Array.from(document.querySelectorAll('table')).map((t) =>
        Array.from(t.rows).map((row) =>
          Array.from(row.cells).map((c) => (c.innerText || '').trim())
        )
      );
      const anchors = {{}};
      for (const el of document.querySelectorAll('[id]')) {{
        anchors[el.id] = (el.innerText || el.value || '').trim();
      }}
      const texts = [];
      for (const el of document.querySelectorAll('td, th, span, p, div, label, b')) {{
        const t = (el.innerText || '').trim();
        if (t && el.children.length === 0) texts.push(t);
      }}
      const controls = {{}};
      for (const el of document.querySelectorAll('select[name]')) {{
        controls[el.name] = {{ value: el.value, visible: visible(el) }};
      }}
      for (const el of document.querySelectorAll('input[type=radio][name]')) {{
        controls[el.name + '=' + el.value] = {{
          value: el.checked ? el.value : null,
          visible: visible(el),
        }};
      }}
      return {{ title: document.title, tables, anchors, texts, controls }};
    }});
    console.log('{marker}' + JSON.stringify(snapshot));
  }} catch (error) {{
    console.error(JSON.stringify({{ error: error.message }}));
    process.exit(1);
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            marker = SNAPSHOT_MARKER,
        ));

        script
    }

    fn action_to_js(&self, action: &UiAction) -> String {
        match action {
            UiAction::Goto(path) => format!(
                r#"    await page.goto(baseUrl + '{}', {{ waitUntil: 'load' }});"#,
                js_escape(path)
            ),
            UiAction::Select { name, value } => format!(
                r#"    await page.selectOption('select[name="{}"]', '{}');"#,
                js_escape(name),
                js_escape(value)
            ),
            UiAction::CheckRadio { name, value } => format!(
                r#"    await page.check('input[name="{}"][value="{}"]');"#,
                js_escape(name),
                js_escape(value)
            ),
            UiAction::Click(selector) => {
                format!(r#"    await page.click('{}');"#, js_escape(selector))
            }
            UiAction::Fill { name, value } => format!(
                r#"    await page.fill('[name="{}"]', '{}');"#,
                js_escape(name),
                js_escape(value)
            ),
            UiAction::Settle(d) => {
                format!(r#"    await page.waitForTimeout({});"#, d.as_millis())
            }
        }
    }

    async fn run_script(&self, script: &str) -> E2eResult<PageSnapshot> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("session.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright session: {}", script_path.display());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(E2eError::Driver(format!(
                "session script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = stdout
            .lines()
            .rev()
            .find_map(|line| line.trim().strip_prefix(SNAPSHOT_MARKER))
            .ok_or_else(|| {
                E2eError::SnapshotParse("session produced no snapshot line".to_string())
            })?;

        PageSnapshot::from_json(payload)
    }
}

fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
