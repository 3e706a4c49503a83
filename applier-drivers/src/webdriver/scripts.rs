//! JavaScript snippets executed through WebDriver.

/// Installs console/error/resource capture into `window.__applierDiag`.
/// Re-running it on the same document is a no-op.
pub const INSTALL_DIAGNOSTICS_HOOK: &str = r#"
    if (window.__applierDiag) { return false; }
    const buf = [];
    window.__applierDiag = buf;
    const push = (ev) => { if (buf.length < 500) { buf.push(ev); } };
    for (const level of ['error', 'warn']) {
        const orig = console[level];
        console[level] = function (...args) {
            push({ kind: 'console', level, text: args.map(String).join(' ') });
            return orig.apply(this, args);
        };
    }
    window.addEventListener('error', (e) => push({ kind: 'page_error', message: String(e.message) }));
    window.addEventListener('unhandledrejection', (e) => push({ kind: 'page_error', message: String(e.reason) }));
    if (window.PerformanceObserver) {
        new PerformanceObserver((list) => {
            for (const entry of list.getEntries()) {
                push({ kind: 'resource', url: entry.name, initiator: entry.initiatorType || '' });
            }
        }).observe({ type: 'resource', buffered: false });
    }
    return true;
"#;

/// Returns and clears the captured events.
pub const DRAIN_DIAGNOSTICS: &str = r#"
    const buf = window.__applierDiag;
    if (!buf) { return []; }
    return buf.splice(0, buf.length);
"#;

pub const IS_CONNECTED: &str = "return arguments[0].isConnected === true;";

/// Document readiness plus the number of resource entries seen so far.
pub const NETWORK_SNAPSHOT: &str = r#"
    return {
        ready: document.readyState === 'complete',
        resources: performance.getEntriesByType('resource').length
    };
"#;
