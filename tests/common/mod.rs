#![allow(dead_code)]

pub mod sockets {
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Fresh directory plus a socket path inside it
    ///
    /// Socket paths are limited to ~100 bytes, so keep the name short.
    pub fn temp_socket() -> (TempDir, PathBuf) {
        let dir = tempfile::Builder::new().prefix("gosp").tempdir().unwrap();
        let path = dir.path().join("p.sock");
        (dir, path)
    }

    /// Poll until `path` exists (or doesn't), up to `limit`
    pub fn wait_for(path: &Path, exists: bool, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if path.exists() == exists {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        path.exists() == exists
    }
}

pub mod pages {
    use gosp_runtime::PageContext;
    use std::io::Write;

    /// Plain-text page that echoes the request URI
    pub fn uri_page(ctx: &mut PageContext) -> anyhow::Result<()> {
        ctx.set_mime_type("text/plain");
        let uri = ctx.request().map(|r| r.uri.clone()).unwrap_or_default();
        write!(ctx, "uri={uri}")?;
        Ok(())
    }

    /// Page that always panics after writing part of a body
    pub fn panicking_page(ctx: &mut PageContext) -> anyhow::Result<()> {
        ctx.set_mime_type("text/html");
        write!(ctx, "<p>partial")?;
        panic!("template exploded");
    }
}

pub mod test_server {
    use gosp_runtime::runtime_config::ServerConfig;
    use gosp_runtime::server::{Server, ServerHandle};
    use gosp_runtime::Page;
    use std::path::Path;
    use std::sync::Once;
    use std::time::Duration;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Config for tests: no idle timeout, short read deadline
    pub fn test_config(socket: &Path) -> ServerConfig {
        ServerConfig::new(socket)
            .with_idle_timeout(Duration::ZERO)
            .with_read_timeout(Duration::from_secs(2))
    }

    pub fn start<P: Page>(config: ServerConfig, page: P) -> ServerHandle {
        setup_may_runtime();
        Server::bind(config, page).unwrap().start().unwrap()
    }
}
