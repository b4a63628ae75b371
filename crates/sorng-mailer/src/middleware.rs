//! Connection middleware run before delivery.
//!
//! A middleware receives the live connection after EHLO and may upgrade or
//! authenticate it. Failures from the connection propagate unchanged.

use log::debug;

use crate::types::*;

/// The parts of an SMTP connection middleware needs.
#[cfg_attr(test, mockall::automock)]
pub trait Connection {
    /// Whether the server advertised the given EHLO extension.
    fn has_extn(&self, name: &str) -> bool;
    fn starttls(&mut self) -> MailerResult<()>;
    fn login(&mut self, username: &str, password: &str) -> MailerResult<()>;
}

pub trait Middleware {
    fn apply(&self, conn: &mut dyn Connection) -> MailerResult<()>;
}

impl<F> Middleware for F
where
    F: Fn(&mut dyn Connection) -> MailerResult<()>,
{
    fn apply(&self, conn: &mut dyn Connection) -> MailerResult<()> {
        self(conn)
    }
}

// ── STARTTLS ────────────────────────────────────────────────────────

/// Upgrade to TLS when the server offers STARTTLS, or always when forced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tls {
    pub force: bool,
}

impl Tls {
    pub fn new(force: bool) -> Self {
        Self { force }
    }
}

impl Middleware for Tls {
    fn apply(&self, conn: &mut dyn Connection) -> MailerResult<()> {
        if conn.has_extn("STARTTLS") || self.force {
            debug!("Issuing STARTTLS (forced: {})", self.force);
            return conn.starttls();
        }
        debug!("Server does not offer STARTTLS, continuing in plain text");
        Ok(())
    }
}

// ── AUTH ────────────────────────────────────────────────────────────

/// Log in with a username and password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl Auth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl From<Credentials> for Auth {
    fn from(c: Credentials) -> Self {
        Self {
            username: c.username,
            password: c.password,
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Middleware for Auth {
    fn apply(&self, conn: &mut dyn Connection) -> MailerResult<()> {
        debug!("Authenticating as {}", self.username);
        conn.login(&self.username, &self.password)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;

    fn conn(starttls_offered: bool) -> MockConnection {
        let mut conn = MockConnection::new();
        conn.expect_has_extn()
            .withf(|name| name == "STARTTLS")
            .return_const(starttls_offered);
        conn
    }

    #[test]
    fn tls_supported_no_force() {
        let mut seq = Sequence::new();
        let mut conn = MockConnection::new();
        conn.expect_has_extn()
            .withf(|name| name == "STARTTLS")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        conn.expect_starttls()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        Tls::default().apply(&mut conn).unwrap();
    }

    #[test]
    fn tls_supported_force() {
        let mut conn = conn(true);
        conn.expect_starttls().times(1).returning(|| Ok(()));
        Tls::new(true).apply(&mut conn).unwrap();
    }

    #[test]
    fn tls_unsupported_no_force() {
        let mut conn = conn(false);
        conn.expect_starttls().never();
        Tls::default().apply(&mut conn).unwrap();
    }

    #[test]
    fn tls_unsupported_force() {
        let mut conn = conn(false);
        conn.expect_starttls().times(1).returning(|| Ok(()));
        Tls::new(true).apply(&mut conn).unwrap();
    }

    #[test]
    fn tls_error_propagates() {
        let mut conn = conn(true);
        conn.expect_starttls()
            .returning(|| Err(MailerError::tls("handshake failed")));
        let err = Tls::default().apply(&mut conn).unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::TlsError);
    }

    #[test]
    fn auth_logs_in_user() {
        let mut conn = MockConnection::new();
        conn.expect_login()
            .withf(|user, pass| user == "user" && pass == "pass")
            .times(1)
            .returning(|_, _| Ok(()));
        Auth::new("user", "pass").apply(&mut conn).unwrap();
    }

    #[test]
    fn auth_error_propagates() {
        let mut conn = MockConnection::new();
        conn.expect_login()
            .returning(|_, _| Err(MailerError::auth("535 bad credentials").with_code(535)));
        let err = Auth::new("user", "wrong").apply(&mut conn).unwrap_err();
        assert_eq!(err.kind, MailerErrorKind::AuthFailure);
        assert_eq!(err.code, Some(535));
    }

    #[test]
    fn auth_debug_hides_password() {
        let dbg = format!("{:?}", Auth::new("user", "hunter2"));
        assert!(dbg.contains("user"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn closures_are_middleware() {
        let mut conn = MockConnection::new();
        conn.expect_login().times(1).returning(|_, _| Ok(()));
        let mw = |c: &mut dyn Connection| c.login("svc", "token");
        mw.apply(&mut conn).unwrap();
    }

    #[test]
    fn auth_from_credentials() {
        let auth = Auth::from(Credentials::new("u", "p"));
        assert_eq!(auth, Auth::new("u", "p"));
    }
}
