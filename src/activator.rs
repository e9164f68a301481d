//! Turns a descriptor into a live instance
//!
//! Factories are invoked with the provider. Implementation types have their
//! widest constructor selected and each parameter resolved through the
//! provider, which is the recursive step of transitive resolution.

use crate::activatable::{Arguments, ImplementationType};
use crate::storage::Instance;
use crate::{Activation, BoxError, DiError, Result, ServiceDescriptor, ServiceKey, ServiceProvider};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Produce one instance for `descriptor`
pub(crate) fn activate(provider: &ServiceProvider, descriptor: &ServiceDescriptor) -> Result<Instance> {
    let key = descriptor.key();

    match descriptor.activation() {
        Activation::Instance(instance) => Ok(Arc::clone(instance)),
        Activation::Factory(factory) => {
            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = key.type_name(),
                lifetime = ?descriptor.lifetime(),
                "Invoking service factory"
            );

            factory(provider).map_err(|cause| into_activation_error(key, cause))
        }
        Activation::Type(implementation) => activate_type(provider, key, implementation),
    }
}

fn activate_type(
    provider: &ServiceProvider,
    key: ServiceKey,
    implementation: &ImplementationType,
) -> Result<Instance> {
    let constructor = implementation.select_constructor().ok_or_else(|| {
        DiError::configuration(format!(
            "{} declares no constructor for {key}",
            implementation.type_name()
        ))
    })?;

    #[cfg(feature = "logging")]
    debug!(
        target: "service_container",
        service = key.type_name(),
        implementation = implementation.type_name(),
        parameters = constructor.params().len(),
        "Activating implementation type"
    );

    let mut resolved = Vec::with_capacity(constructor.params().len());
    for &param in constructor.params() {
        resolved.push((param, provider.resolve_key(param)?));
    }

    constructor
        .construct(&mut Arguments::new(resolved))
        .map_err(|cause| DiError::activation(key, cause))
}

/// Container errors raised by nested resolution pass through unchanged;
/// anything else the factory raised is wrapped with the failing key.
fn into_activation_error(key: ServiceKey, cause: BoxError) -> DiError {
    match cause.downcast::<DiError>() {
        Ok(nested) => *nested,
        Err(cause) => DiError::activation(key, cause),
    }
}
