//! PowerShell-backed [`AgentChannel`].
//!
//! Every request is rendered to a script by [`render_script`], encoded as
//! UTF-16LE base64 and handed to `powershell.exe -EncodedCommand`, so adapter
//! names never pass through a command line unquoted. A batch of steps becomes
//! one script and one (possibly elevated) process.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::domain::ports::agent::{AgentChannel, AgentRequest, AgentStep};
use crate::domain::ports::process::{ExecutionOptions, ProcessExecutor, ProcessResult, SystemInfo};
use crate::error::PoserError;

/// Network adapter device class in the registry.
pub const ADAPTER_CLASS_KEY: &str =
    r"HKLM:\SYSTEM\CurrentControlSet\Control\Class\{4d36e972-e325-11ce-bfc1-08002be10318}";

/// Registry value drivers read their override address from.
pub const OVERRIDE_VALUE_NAME: &str = "NetworkAddress";

const SCRIPT_PREAMBLE: &str = "$ErrorActionPreference = 'Stop'\n$ProgressPreference = 'SilentlyContinue'\n";

// ============================================================================
// SCRIPT RENDERING
// ============================================================================

/// Single-quoted PowerShell literal; embedded quotes are doubled.
pub fn ps_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A standalone script for one request.
pub fn render_script(request: &AgentRequest) -> String {
    format!("{}{}", SCRIPT_PREAMBLE, render_body(request))
}

/// One script running every step in order. Only the last `Send` step writes
/// to stdout; a failing `TrySend` is swallowed.
pub fn render_batch(steps: &[AgentStep]) -> String {
    let last_send = steps.iter().rposition(|step| matches!(step, AgentStep::Send(_)));

    let mut script = String::from(SCRIPT_PREAMBLE);
    for (index, step) in steps.iter().enumerate() {
        match step {
            AgentStep::Send(request) if Some(index) == last_send => {
                script.push_str(&format!("& {{\n{}}}\n", render_body(request)));
            }
            AgentStep::Send(request) => {
                script.push_str(&format!("& {{\n{}}} | Out-Null\n", render_body(request)));
            }
            AgentStep::TrySend(request) => {
                script.push_str(&format!(
                    "try {{\n& {{\n{}}} | Out-Null\n}} catch {{\n}}\n",
                    render_body(request)
                ));
            }
            AgentStep::Settle(delay) => {
                script.push_str(&format!("Start-Sleep -Milliseconds {}\n", delay.as_millis()));
            }
        }
    }
    script
}

/// The one place an [`AgentRequest`] becomes PowerShell source.
fn render_body(request: &AgentRequest) -> String {
    match request {
        AgentRequest::ListAdapters => concat!(
            "$rows = @(Get-NetAdapter | ForEach-Object {\n",
            "    [pscustomobject]@{\n",
            "        Name = $_.Name\n",
            "        InterfaceDescription = $_.InterfaceDescription\n",
            "        Status = [string]$_.Status\n",
            "        MacAddress = $_.MacAddress\n",
            "        Guid = $_.InterfaceGuid.ToString()\n",
            "    }\n",
            "})\n",
            "ConvertTo-Json -InputObject $rows -Depth 3 -Compress\n",
        )
        .to_string(),

        AgentRequest::ReadIdentifier { adapter } => format!(
            "$a = Get-NetAdapter -Name {} -ErrorAction SilentlyContinue\nif ($a) {{ $a.MacAddress }}\n",
            ps_literal(adapter)
        ),

        AgentRequest::ResolveCorrelationId { adapter } => format!(
            "$a = Get-NetAdapter -Name {} -ErrorAction SilentlyContinue\nif ($a) {{ $a.InterfaceGuid.ToString() }}\n",
            ps_literal(adapter)
        ),

        AgentRequest::FindConfigKey { correlation_id } => format!(
            concat!(
                "Get-ChildItem -LiteralPath {class} -ErrorAction SilentlyContinue | ForEach-Object {{\n",
                "    $p = Get-ItemProperty -LiteralPath $_.PSPath -ErrorAction SilentlyContinue\n",
                "    if ($p -and $p.NetCfgInstanceId -eq {guid}) {{ $_.PSPath }}\n",
                "}} | Select-Object -First 1\n",
            ),
            class = ps_literal(ADAPTER_CLASS_KEY),
            guid = ps_literal(correlation_id)
        ),

        AgentRequest::WriteOverride { key, value } => format!(
            concat!(
                "$key = {key}\n",
                "if (Get-ItemProperty -LiteralPath $key -Name {name} -ErrorAction SilentlyContinue) {{\n",
                "    Set-ItemProperty -LiteralPath $key -Name {name} -Value {value}\n",
                "}} else {{\n",
                "    New-ItemProperty -LiteralPath $key -Name {name} -PropertyType String -Value {value} | Out-Null\n",
                "}}\n",
            ),
            key = ps_literal(key),
            name = ps_literal(OVERRIDE_VALUE_NAME),
            value = ps_literal(value)
        ),

        AgentRequest::SetAdvancedProperty { adapter, value } => format!(
            "Set-NetAdapterAdvancedProperty -Name {} -DisplayName 'Network Address' -DisplayValue {} -NoRestart | Out-Null\n",
            ps_literal(adapter),
            ps_literal(value)
        ),

        AgentRequest::RemoveOverride { key } => format!(
            "Remove-ItemProperty -LiteralPath {} -Name {} -ErrorAction SilentlyContinue\n",
            ps_literal(key),
            ps_literal(OVERRIDE_VALUE_NAME)
        ),

        AgentRequest::DisableAdapter { adapter } => format!(
            "Disable-NetAdapter -Name {} -Confirm:$false | Out-Null\n",
            ps_literal(adapter)
        ),

        AgentRequest::EnableAdapter { adapter } => format!(
            "Enable-NetAdapter -Name {} -Confirm:$false | Out-Null\n",
            ps_literal(adapter)
        ),

        AgentRequest::CheckElevation => concat!(
            "$id = [Security.Principal.WindowsIdentity]::GetCurrent()\n",
            "([Security.Principal.WindowsPrincipal]$id).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)\n",
        )
        .to_string(),
    }
}

/// Base64 of the script's UTF-16LE bytes, as `-EncodedCommand` expects.
pub fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

fn looks_access_denied(diagnostics: &str) -> bool {
    let lower = diagnostics.to_lowercase();
    lower.contains("access is denied")
        || lower.contains("permissiondenied")
        || lower.contains("requires elevation")
        || lower.contains("unauthorizedaccess")
        // wrapper prompt dismissed
        || lower.contains("canceled by the user")
        || lower.contains("cancelled by the user")
}

// ============================================================================
// CHANNEL
// ============================================================================

/// Runs agent requests through a PowerShell host.
pub struct PowerShellChannel<P, S> {
    executor: P,
    system: S,
    powershell_path: String,
    elevation_command: Option<String>,
    timeout: Duration,
}

impl<P, S> PowerShellChannel<P, S>
where
    P: ProcessExecutor + Send + Sync,
    S: SystemInfo + Send + Sync,
{
    pub fn new(executor: P, system: S) -> Self {
        Self {
            executor,
            system,
            powershell_path: "powershell.exe".to_string(),
            elevation_command: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_powershell_path(mut self, path: impl Into<String>) -> Self {
        self.powershell_path = path.into();
        self
    }

    /// Wrapper (e.g. `gsudo`) used for mutating requests when the process
    /// itself is not elevated.
    pub fn with_elevation_command(mut self, command: Option<String>) -> Self {
        self.elevation_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program and arguments for one script, optionally behind the elevation wrapper.
    fn invocation(&self, script: &str, elevated: bool) -> (String, Vec<String>) {
        let mut args = vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-EncodedCommand".to_string(),
            encode_command(script),
        ];

        match (&self.elevation_command, elevated) {
            (Some(wrapper), true) => {
                args.insert(0, self.powershell_path.clone());
                (wrapper.clone(), args)
            }
            _ => (self.powershell_path.clone(), args),
        }
    }

    fn needs_wrapper(&self, requires_elevation: bool) -> bool {
        requires_elevation && !self.system.has_admin_privileges()
    }

    async fn run(&self, kind: &str, script: &str, elevated: bool) -> crate::Result<ProcessResult> {
        let (program, args) = self.invocation(script, elevated);
        let options = ExecutionOptions::new().with_timeout(self.timeout);

        debug!(kind, program = %program, elevated, "agent request");
        let result = self.executor.execute_command(&program, &args, &options).await?;

        debug!(
            kind,
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "agent response"
        );
        Ok(result)
    }
}

fn into_output(result: ProcessResult) -> crate::Result<String> {
    if result.success() {
        return Ok(result.stdout.trim().to_string());
    }

    let diagnostics = result.diagnostics();
    if looks_access_denied(&diagnostics) {
        Err(PoserError::PermissionDenied(diagnostics))
    } else {
        Err(PoserError::ExternalAgentFailure(diagnostics))
    }
}

#[async_trait]
impl<P, S> AgentChannel for PowerShellChannel<P, S>
where
    P: ProcessExecutor + Send + Sync,
    S: SystemInfo + Send + Sync,
{
    async fn elevate(&self) -> crate::Result<()> {
        if self.system.has_admin_privileges() {
            return Ok(());
        }

        let Some(wrapper) = self.elevation_command.as_deref() else {
            return Err(PoserError::PermissionDenied(
                "administrator rights are required; run from an elevated shell or set elevation_command"
                    .to_string(),
            ));
        };

        let check = AgentRequest::CheckElevation;
        let result = self.run(check.kind(), &render_script(&check), true).await?;
        if result.success() && result.stdout.trim().eq_ignore_ascii_case("true") {
            debug!(wrapper, "elevation granted");
            Ok(())
        } else {
            warn!(wrapper, exit_code = result.exit_code, "elevation declined");
            Err(PoserError::PermissionDenied(format!(
                "elevation through {} was declined",
                wrapper
            )))
        }
    }

    async fn send(&self, request: &AgentRequest) -> crate::Result<String> {
        let elevated = self.needs_wrapper(request.requires_elevation());
        let result = self.run(request.kind(), &render_script(request), elevated).await?;
        into_output(result)
    }

    /// The whole batch runs as one process, so a non-admin caller sees at most
    /// one elevation prompt per batch.
    async fn send_batch(&self, steps: &[AgentStep]) -> crate::Result<String> {
        let elevated = self.needs_wrapper(steps.iter().any(AgentStep::requires_elevation));
        let result = self.run("batch", &render_batch(steps), elevated).await?;
        into_output(result)
    }
}
