// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traits for driving resources held by an external system towards a declared state.
//!
//! Implementors are usually handles on the external system, parameterized by the kind of
//! resource they manage. All operations are asynchronous and report their result through an
//! associated `Outcome` type.
//!
//! The associated types are [GAT]s parameterized over a lifetime `'a where Self: 'a`, so that
//! implementations may take references (shared or exclusive) to the caller's records.
//!
//! [GAT]: https://rust-lang.github.io/generic-associated-types-initiative/explainer/motivation.html

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

/// Observe the state of one resource of an external system.
pub trait Observe {
    /// What to observe, and where to record what was seen.
    type Subject<'a>
    where
        Self: 'a;

    /// The result of the observation.
    type Observation<'a>
    where
        Self: 'a;

    /// Observe the external system.
    ///
    /// # Contract
    ///
    /// Implementations must not mutate the state of the external system.
    fn observe<'a>(
        &self,
        subject: Self::Subject<'a>,
    ) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a;
}

/// Create an external resource in service of a `Requirement`.
pub trait Create {
    /// The data required to create the resource.
    type Requirement<'a>
    where
        Self: 'a;

    /// Any data returned by the `create` operation.
    /// Often this is `Result<(), SomeErrorType>`.
    type Outcome<'a>
    where
        Self: 'a;

    fn create<'a>(
        &self,
        requirement: Self::Requirement<'a>,
    ) -> impl Future<Output = Self::Outcome<'a>> + Send
    where
        Self: 'a;
}

/// Drive an extant resource closer to the state described by a requirement.
pub trait Update {
    /// The state the resource should be driven to.
    type Requirement<'a>
    where
        Self: 'a;

    /// The resource as it currently is.
    type Observation<'a>
    where
        Self: 'a;

    type Outcome<'a>
    where
        Self: 'a;

    /// Attempt to drive an extant (observed) resource closer to the state described by a
    /// requirement.
    ///
    /// # Contract
    ///
    /// Driving the observed state _all the way_ to the requirement is not required. An update
    /// may fail half way and leave the changes it managed to apply in place; callers converge by
    /// updating again.
    fn update<'a>(
        &self,
        requirement: Self::Requirement<'a>,
        observation: Self::Observation<'a>,
    ) -> impl Future<Output = Self::Outcome<'a>> + Send
    where
        Self: 'a;
}

/// Remove an observed external resource.
pub trait Remove {
    type Observation<'a>
    where
        Self: 'a;

    type Outcome<'a>
    where
        Self: 'a;

    /// Remove an observed external resource.
    ///
    /// # Contract
    ///
    /// Removing a resource which turns out to be gone already is not an error.
    fn remove<'a>(
        &self,
        observation: Self::Observation<'a>,
    ) -> impl Future<Output = Self::Outcome<'a>> + Send
    where
        Self: 'a;
}

/// Take an existing external resource under management, given only its external key.
pub trait Import {
    /// The external key of the resource.
    type Key<'a>
    where
        Self: 'a;

    /// Typically the record of the imported resource, or an error.
    type Outcome<'a>
    where
        Self: 'a;

    fn import<'a>(&self, key: Self::Key<'a>) -> impl Future<Output = Self::Outcome<'a>> + Send
    where
        Self: 'a;
}

/// Attempt to drive an external resource into its required condition.
pub trait Reconcile {
    type Requirement<'a>
    where
        Self: 'a;

    type Observation<'a>
    where
        Self: 'a;

    /// Often `Option<Op<'a, Self>>`, with `None` meaning nothing had to be done.
    type Outcome<'a>
    where
        Self: 'a;

    /// Attempt to drive a resource closer to the state described by a requirement, creating or
    /// removing it as needed.
    ///
    /// # Contract
    ///
    /// As for [`Update`], there is no assurance that the resource meets the requirement once
    /// this returns. Further calls to `reconcile` should converge.
    fn reconcile<'a>(
        &self,
        requirement: Self::Requirement<'a>,
        observation: Self::Observation<'a>,
    ) -> impl Future<Output = Self::Outcome<'a>> + Send
    where
        Self: 'a;
}

/// The operation performed by a [`Reconcile`] implementation, with its outcome.
pub enum Op<'a, H: 'a + Create + Update + Remove> {
    Create(<H as Create>::Outcome<'a>),
    Update(<H as Update>::Outcome<'a>),
    Remove(<H as Remove>::Outcome<'a>),
}

impl<'a, H: 'a + Create + Update + Remove> Op<'a, H> {
    /// The name of the operation, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Create(_) => "create",
            Op::Update(_) => "update",
            Op::Remove(_) => "remove",
        }
    }
}
