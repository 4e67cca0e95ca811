// ABOUTME: Classifies failure text into user-facing hints with suggested next steps

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    Network,
    PermissionDenied,
    DiskFull,
    DaemonNotRunning,
    PortConflict,
    TemplateMissing,
    RepositoryNotFound,
    GitMissing,
    AlreadyExists,
    Unknown,
}

/// What to tell the user after a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub kind: HintKind,
    pub headline: &'static str,
    pub actions: &'static [&'static str],
}

impl Hint {
    fn of(kind: HintKind) -> Self {
        let (headline, actions): (&'static str, &'static [&'static str]) = match kind {
            HintKind::Network => (
                "Network issue",
                &["Check your internet connection", "Verify DNS settings"],
            ),
            HintKind::PermissionDenied => (
                "Permission denied",
                &[
                    "Add your user to the docker group: sudo usermod -aG docker $USER",
                    "Check ownership of the development directory",
                ],
            ),
            HintKind::DiskFull => (
                "Not enough disk space",
                &["Free up disk space", "Remove unused images: docker system prune"],
            ),
            HintKind::DaemonNotRunning => (
                "Docker daemon is not running",
                &["Start Docker Desktop", "Or start the service: sudo systemctl start docker"],
            ),
            HintKind::PortConflict => (
                "A port is already in use by another application",
                &[
                    "Find the conflicting process: sudo lsof -i :<port>",
                    "Stop it or choose a different port",
                ],
            ),
            HintKind::TemplateMissing => (
                "A template file is missing from the scaffold repository",
                &["Check that the scaffold repository contains .env.example"],
            ),
            HintKind::RepositoryNotFound => (
                "Repository could not be cloned",
                &[
                    "Check the repository URL",
                    "Private repositories require authentication",
                ],
            ),
            HintKind::GitMissing => (
                "A required executable is not installed",
                &["Ubuntu/Debian: sudo apt install git", "macOS: brew install git"],
            ),
            HintKind::AlreadyExists => (
                "Something with this name already exists",
                &["Choose a different project name or proxy hostname"],
            ),
            HintKind::Unknown => ("Unexpected failure", &["Fix the issue above and try again"]),
        };

        Self {
            kind,
            headline,
            actions,
        }
    }
}

/// Pattern-match error text. The first matching category wins.
pub fn classify(message: &str) -> Hint {
    let text = message.to_lowercase();
    let has = |needle: &str| text.contains(needle);

    let kind = if has("cannot connect to the docker daemon") {
        HintKind::DaemonNotRunning
    } else if has("port is already allocated") || has("address already in use") {
        HintKind::PortConflict
    } else if has("permission denied") {
        HintKind::PermissionDenied
    } else if has("no space left") {
        HintKind::DiskFull
    } else if has("repository not found") || has("status code: 404") || has("authentication") {
        HintKind::RepositoryNotFound
    } else if has("executable file not found") || has("command not found") {
        HintKind::GitMissing
    } else if (has(".env.example") || has("example"))
        && (has("does not exist") || has("no such file"))
    {
        HintKind::TemplateMissing
    } else if has("already in use") || has("already exists") {
        HintKind::AlreadyExists
    } else if has("could not resolve host") || has("network") {
        HintKind::Network
    } else {
        HintKind::Unknown
    };

    Hint::of(kind)
}
