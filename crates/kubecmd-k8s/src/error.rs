//! Mapping of kube-rs errors onto the kubecmd error taxonomy

use kubecmd_types::Error;

/// Which backend path produced the error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    Resource,
    LogStream,
}

/// Classify a kube error by the HTTP status of the API response
///
/// `context` names the operation (`get deployments 'web' in namespace 'prod'`)
/// and prefixes every resulting message.
pub(crate) fn classify(err: kube::Error, origin: Origin, context: &str) -> Error {
    match &err {
        kube::Error::Api(resp) => match resp.code {
            404 => Error::NotFound(format!("{}: {}", context, resp.message)),
            409 => Error::Conflict(format!("{}: {}", context, resp.message)),
            400 | 422 => Error::InvalidArgument(format!("{}: {}", context, resp.message)),
            _ => unavailable(origin, format!("{}: {}", context, resp.message)),
        },
        _ => unavailable(origin, format!("{}: {}", context, err)),
    }
}

fn unavailable(origin: Origin, message: String) -> Error {
    match origin {
        Origin::Resource => Error::BackendUnavailable(message),
        Origin::LogStream => Error::StreamError(message),
    }
}

/// Human-readable scope used in error contexts
pub(crate) fn scope(namespace: &str) -> String {
    if namespace.is_empty() {
        "cluster scope".to_string()
    } else {
        format!("namespace '{}'", namespace)
    }
}
