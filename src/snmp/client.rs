use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

use crate::models::Credential;

use super::value::SnmpValue;
use super::walk::{WalkParser, WalkRow};
use super::SnmpError;

/// Address and credential for one device
#[derive(Debug, Clone)]
pub struct SnmpTarget {
    pub hostname: String,
    pub address: String,
    pub credential: Credential,
}

/// GETBULK (`snmpbulkwalk`) or plain GETNEXT (`snmpwalk`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    Bulk,
    GetNext,
}

/// Rows received for one table plus the reason the walk stopped early, if
/// it did. Rows that arrived before a failure are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableWalk {
    pub rows: Vec<WalkRow>,
    pub error: Option<SnmpError>,
}

impl TableWalk {
    pub fn failed(error: SnmpError) -> Self {
        Self {
            rows: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// SNMP operations the collector needs
#[async_trait::async_trait]
pub trait SnmpTransport: Send + Sync {
    async fn get(
        &self,
        target: &SnmpTarget,
        oid: &str,
        timeout: Duration,
    ) -> Result<SnmpValue, SnmpError>;

    async fn walk(
        &self,
        target: &SnmpTarget,
        oid: &str,
        mode: WalkMode,
        timeout: Duration,
    ) -> TableWalk;
}

/// Transport that shells out to the net-snmp command line tools
#[derive(Debug, Clone)]
pub struct NetSnmpTransport {
    pub snmpget_bin: String,
    pub snmpwalk_bin: String,
    pub snmpbulkwalk_bin: String,
    pub request_timeout_secs: u64,
    pub retries: u32,
}

impl NetSnmpTransport {
    fn base_args(&self, target: &SnmpTarget) -> Vec<String> {
        let mut args = credential_args(&target.credential);
        args.extend([
            "-On".to_string(),
            "-t".to_string(),
            self.request_timeout_secs.to_string(),
            "-r".to_string(),
            self.retries.to_string(),
        ]);
        args
    }

    /// Run a net-snmp tool, streaming stdout through a walk parser until the
    /// process exits or the deadline passes.
    async fn run(&self, bin: &str, args: Vec<String>, oid: &str, limit: Duration) -> TableWalk {
        let deadline = Instant::now() + limit;
        let mut child = match Command::new(bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return TableWalk::failed(SnmpError::Spawn {
                    bin: bin.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let mut walk = TableWalk::default();
        let mut parser = WalkParser::new(oid);
        let Some(stdout) = child.stdout.take() else {
            return TableWalk::failed(SnmpError::Command("stdout not captured".to_string()));
        };
        // split on raw bytes so one undecodable line cannot end the walk
        let mut lines = BufReader::new(stdout).split(b'\n');

        loop {
            match timeout_at(deadline, lines.next_segment()).await {
                Ok(Ok(Some(segment))) => {
                    let text = String::from_utf8_lossy(&segment);
                    let line = text.strip_suffix('\r').unwrap_or(&text);
                    walk.rows.extend(parser.feed(line));
                }
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    walk.error = Some(SnmpError::Command(e.to_string()));
                    break;
                }
                Err(_) => {
                    if let Err(e) = child.start_kill() {
                        tracing::debug!("Failed to kill {}: {}", bin, e);
                    }
                    walk.rows.extend(parser.finish());
                    walk.error = Some(SnmpError::Timeout { secs: limit.as_secs() });
                    return walk;
                }
            }
        }
        walk.rows.extend(parser.finish());

        let mut stderr = String::new();
        if let Some(mut err) = child.stderr.take() {
            let _ = timeout_at(deadline, err.read_to_string(&mut stderr)).await;
        }

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                walk.error.get_or_insert(SnmpError::Command(e.to_string()));
                return walk;
            }
            Err(_) => {
                let _ = child.start_kill();
                walk.error.get_or_insert(SnmpError::Timeout { secs: limit.as_secs() });
                return walk;
            }
        };

        if walk.error.is_none() {
            if !status.success() {
                walk.error = Some(classify_stderr(&stderr, self.request_timeout_secs));
            } else if walk.rows.is_empty() && parser.unsupported() {
                walk.error = Some(SnmpError::Unsupported);
            }
        }
        if parser.skipped() > 0 {
            tracing::debug!(
                "{}: skipped {} malformed lines walking {}",
                bin,
                parser.skipped(),
                oid
            );
        }
        walk
    }
}

#[async_trait::async_trait]
impl SnmpTransport for NetSnmpTransport {
    async fn get(
        &self,
        target: &SnmpTarget,
        oid: &str,
        timeout: Duration,
    ) -> Result<SnmpValue, SnmpError> {
        let mut args = self.base_args(target);
        args.push(target.address.clone());
        args.push(oid.to_string());

        let walk = self.run(&self.snmpget_bin, args, oid, timeout).await;
        if let Some(e) = walk.error {
            return Err(e);
        }
        walk.rows
            .into_iter()
            .next()
            .map(|row| row.value)
            .ok_or(SnmpError::Unsupported)
    }

    async fn walk(
        &self,
        target: &SnmpTarget,
        oid: &str,
        mode: WalkMode,
        timeout: Duration,
    ) -> TableWalk {
        let bin = match mode {
            WalkMode::Bulk => &self.snmpbulkwalk_bin,
            WalkMode::GetNext => &self.snmpwalk_bin,
        };
        let mut args = self.base_args(target);
        args.push(target.address.clone());
        args.push(oid.to_string());
        self.run(bin, args, oid, timeout).await
    }
}

/// Version and security arguments for a credential
pub fn credential_args(credential: &Credential) -> Vec<String> {
    match credential {
        Credential::Community { community } => {
            vec!["-v2c".to_string(), "-c".to_string(), community.clone()]
        }
        Credential::Usm {
            user,
            auth_protocol,
            auth_password,
            priv_protocol,
            priv_password,
        } => vec![
            "-v3".to_string(),
            "-u".to_string(),
            user.clone(),
            "-l".to_string(),
            "authPriv".to_string(),
            "-a".to_string(),
            auth_protocol.clone(),
            "-A".to_string(),
            auth_password.clone(),
            "-x".to_string(),
            priv_protocol.clone(),
            "-X".to_string(),
            priv_password.clone(),
        ],
    }
}

fn classify_stderr(stderr: &str, request_timeout_secs: u64) -> SnmpError {
    let msg = stderr.trim();
    if msg.contains("Timeout") {
        SnmpError::Timeout { secs: request_timeout_secs }
    } else if msg.contains("No Such Object") || msg.contains("No Such Instance") {
        SnmpError::Unsupported
    } else if msg.is_empty() {
        SnmpError::Command("exited with non-zero status".to_string())
    } else {
        SnmpError::Command(msg.lines().next().unwrap_or(msg).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2c_args() {
        let args = credential_args(&Credential::Community {
            community: "public".to_string(),
        });
        assert_eq!(args, vec!["-v2c", "-c", "public"]);
    }

    #[test]
    fn test_v3_args() {
        let args = credential_args(&Credential::Usm {
            user: "inventory".to_string(),
            auth_protocol: "SHA".to_string(),
            auth_password: "authpass".to_string(),
            priv_protocol: "AES".to_string(),
            priv_password: "privpass".to_string(),
        });
        assert_eq!(
            args,
            vec![
                "-v3", "-u", "inventory", "-l", "authPriv", "-a", "SHA", "-A", "authpass", "-x",
                "AES", "-X", "privpass"
            ]
        );
    }

    #[test]
    fn test_classify_stderr() {
        assert_eq!(
            classify_stderr("Timeout: No Response from 10.0.0.1\n", 10),
            SnmpError::Timeout { secs: 10 }
        );
        assert_eq!(
            classify_stderr("", 10),
            SnmpError::Command("exited with non-zero status".to_string())
        );
        assert_eq!(
            classify_stderr("snmpwalk: Unknown host (bogus)\n", 10),
            SnmpError::Command("snmpwalk: Unknown host (bogus)".to_string())
        );
    }

    const DESCR_OID: &str = "1.3.6.1.2.1.47.1.1.1.1.2";

    fn transport(bin: &str) -> NetSnmpTransport {
        NetSnmpTransport {
            snmpget_bin: bin.to_string(),
            snmpwalk_bin: bin.to_string(),
            snmpbulkwalk_bin: bin.to_string(),
            request_timeout_secs: 3,
            retries: 0,
        }
    }

    fn target() -> SnmpTarget {
        SnmpTarget {
            hostname: "sw1".to_string(),
            address: "127.0.0.1".to_string(),
            credential: Credential::Community {
                community: "public".to_string(),
            },
        }
    }

    /// Stand-in for a net-snmp tool: a shell script that ignores its arguments
    fn fake_tool(dir: &tempfile::TempDir, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("snmpbulkwalk");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let walk = transport("/nonexistent/snmpbulkwalk")
            .walk(&target(), DESCR_OID, WalkMode::Bulk, Duration::from_secs(1))
            .await;
        assert!(walk.rows.is_empty());
        assert!(matches!(walk.error, Some(SnmpError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_deadline_keeps_rows_and_kills_tool() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_tool(
            &dir,
            "echo '.1.3.6.1.2.1.47.1.1.1.1.2.1 = STRING: \"Nexus 5548 Chassis\"'\n\
             echo '.1.3.6.1.2.1.47.1.1.1.1.2.22 = STRING: \"Supervisor\"'\n\
             exec sleep 30",
        );

        let started = std::time::Instant::now();
        let walk = transport(&bin)
            .walk(&target(), DESCR_OID, WalkMode::Bulk, Duration::from_secs(2))
            .await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(walk.error, Some(SnmpError::Timeout { secs: 2 }));
        assert_eq!(walk.rows.len(), 2);
        assert_eq!(walk.rows[0].index, 1);
        assert_eq!(walk.rows[1].index, 22);
        assert_eq!(walk.rows[1].value, SnmpValue::Text("Supervisor".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_exit_classified_from_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_tool(&dir, "echo 'Timeout: No Response from 127.0.0.1' >&2\nexit 1");

        let walk = transport(&bin)
            .walk(&target(), DESCR_OID, WalkMode::GetNext, Duration::from_secs(10))
            .await;
        assert!(walk.rows.is_empty());
        assert_eq!(walk.error, Some(SnmpError::Timeout { secs: 3 }));

        let err = transport(&bin)
            .get(&target(), "1.3.6.1.2.1.1.1.0", Duration::from_secs(10))
            .await;
        assert_eq!(err, Err(SnmpError::Timeout { secs: 3 }));
    }

    #[tokio::test]
    async fn test_undecodable_line_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_tool(
            &dir,
            "echo '.1.3.6.1.2.1.47.1.1.1.1.2.1 = STRING: \"Chassis\"'\n\
             printf '\\377\\376\\n'\n\
             echo '.1.3.6.1.2.1.47.1.1.1.1.2.2 = STRING: \"Module\"'",
        );

        let walk = transport(&bin)
            .walk(&target(), DESCR_OID, WalkMode::Bulk, Duration::from_secs(10))
            .await;
        assert_eq!(walk.error, None);
        let values: Vec<String> = walk.rows.iter().map(|r| r.value.as_text()).collect();
        assert_eq!(values, vec!["Chassis", "Module"]);
    }
}
