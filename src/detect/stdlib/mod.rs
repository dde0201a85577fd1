//! Standard-library and builtin module names per ecosystem.
//!
//! The sets are compiled into the binary as perfect-hash sets keyed by the
//! root segment of a module path.

use phf::{phf_set, Set};

use crate::analysis::Ecosystem;

static PYTHON_STDLIB: Set<&'static str> = phf_set! {
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "bisect", "builtins", "bz2",
    "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code", "codecs", "codeop", "collections",
    "colorsys", "compileall", "concurrent", "configparser", "contextlib", "contextvars", "copy",
    "copyreg", "cProfile", "crypt", "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm",
    "decimal", "difflib", "dis", "doctest", "email", "encodings", "ensurepip", "enum", "errno",
    "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions", "ftplib",
    "functools", "gc", "getopt", "getpass", "gettext", "glob", "graphlib", "grp", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "imaplib", "imghdr", "imp", "importlib",
    "inspect", "io", "ipaddress", "itertools", "json", "keyword", "lib2to3", "linecache",
    "locale", "logging", "lzma", "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap",
    "modulefinder", "msvcrt", "multiprocessing", "netrc", "nntplib", "numbers", "operator",
    "optparse", "os", "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil", "platform",
    "plistlib", "poplib", "posix", "pprint", "profile", "pstats", "pty", "pwd", "py_compile",
    "pyclbr", "pydoc", "queue", "quopri", "random", "re", "readline", "reprlib", "resource",
    "rlcompleter", "runpy", "sched", "secrets", "select", "selectors", "shelve", "shlex",
    "shutil", "signal", "site", "smtplib", "sndhdr", "socket", "socketserver", "sqlite3", "ssl",
    "stat", "statistics", "string", "stringprep", "struct", "subprocess", "sunau", "symtable",
    "sys", "sysconfig", "syslog", "tabnanny", "tarfile", "telnetlib", "tempfile", "termios",
    "textwrap", "threading", "time", "timeit", "tkinter", "token", "tokenize", "tomllib",
    "trace", "traceback", "tracemalloc", "tty", "turtle", "types", "typing", "typing_extensions",
    "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings", "wave", "weakref",
    "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml", "xmlrpc", "zipapp",
    "zipfile", "zipimport", "zlib", "zoneinfo",
};

static NODE_BUILTINS: Set<&'static str> = phf_set! {
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
};

/// PHP builtin namespaces and classes that a `use` statement may name.
static PHP_BUILTINS: Set<&'static str> = phf_set! {
    "ArrayAccess", "ArrayIterator", "ArrayObject", "BackedEnum", "Closure", "Countable",
    "DateInterval", "DatePeriod", "DateTime", "DateTimeImmutable", "DateTimeInterface",
    "DateTimeZone", "DOMDocument", "DOMElement", "Error", "ErrorException", "Exception",
    "Generator", "InvalidArgumentException", "Iterator", "IteratorAggregate", "JsonException",
    "JsonSerializable", "LogicException", "OutOfBoundsException", "PDO", "PDOException",
    "PDOStatement", "Random", "ReflectionClass", "ReflectionException", "ReflectionMethod",
    "RuntimeException", "SplFileInfo", "SplObjectStorage", "SplQueue", "SplStack", "Stringable",
    "Throwable", "Traversable", "TypeError", "UnexpectedValueException", "UnitEnum",
    "ValueError", "WeakMap",
};

/// Root segment of a module path for builtin lookup.
fn root_segment(ecosystem: Ecosystem, module: &str) -> &str {
    match ecosystem {
        Ecosystem::Pip => module.split('.').next().unwrap_or(module),
        Ecosystem::Npm => {
            let module = module.strip_prefix("node:").unwrap_or(module);
            module.split('/').next().unwrap_or(module)
        }
        Ecosystem::Composer => {
            let module = module.trim_start_matches('\\');
            module.split('\\').next().unwrap_or(module)
        }
    }
}

/// Whether a module path names a standard-library or builtin module.
pub fn is_stdlib(ecosystem: Ecosystem, module: &str) -> bool {
    if ecosystem == Ecosystem::Npm && module.starts_with("node:") {
        return true;
    }
    let root = root_segment(ecosystem, module);
    match ecosystem {
        Ecosystem::Pip => PYTHON_STDLIB.contains(root),
        Ecosystem::Npm => NODE_BUILTINS.contains(root),
        Ecosystem::Composer => PHP_BUILTINS.contains(root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_stdlib() {
        assert!(is_stdlib(Ecosystem::Pip, "os"));
        assert!(is_stdlib(Ecosystem::Pip, "os.path"));
        assert!(is_stdlib(Ecosystem::Pip, "collections.abc"));
        assert!(!is_stdlib(Ecosystem::Pip, "requests"));
    }

    #[test]
    fn test_node_builtins() {
        assert!(is_stdlib(Ecosystem::Npm, "fs"));
        assert!(is_stdlib(Ecosystem::Npm, "fs/promises"));
        assert!(is_stdlib(Ecosystem::Npm, "node:test"));
        assert!(!is_stdlib(Ecosystem::Npm, "react"));
    }

    #[test]
    fn test_php_builtins() {
        assert!(is_stdlib(Ecosystem::Composer, "DateTimeImmutable"));
        assert!(is_stdlib(Ecosystem::Composer, "\\RuntimeException"));
        assert!(!is_stdlib(Ecosystem::Composer, "Monolog\\Logger"));
    }
}
