//! End-to-end access flows over the in-memory adapter.

use std::sync::Arc;

use kirana_application::{
    AccessScopeService, GrantAdminService, OnboardingService,
};
use kirana_core::AppError;
use kirana_domain::{
    Company, CompanyRole, EmailAddress, GrantRole, GrantTier, LegalEntityType, Tenant, User,
};
use kirana_infrastructure::InMemoryAccessRepository;

struct Harness {
    repository: Arc<InMemoryAccessRepository>,
    access: AccessScopeService,
    grant_admin: Arc<GrantAdminService>,
    onboarding: OnboardingService,
}

fn harness() -> Harness {
    let repository = Arc::new(InMemoryAccessRepository::new());
    let access = AccessScopeService::new(repository.clone(), repository.clone());
    let grant_admin = Arc::new(GrantAdminService::new(
        access.clone(),
        repository.clone(),
        repository.clone(),
        repository.clone(),
    ));
    let onboarding = OnboardingService::new(
        access.clone(),
        repository.clone(),
        repository.clone(),
        repository.clone(),
        repository.clone(),
    );
    Harness {
        repository,
        access,
        grant_admin,
        onboarding,
    }
}

fn email(value: &str) -> EmailAddress {
    match EmailAddress::new(value) {
        Ok(email) => email,
        Err(error) => panic!("email should be valid: {error}"),
    }
}

async fn register(harness: &Harness, address: &str) -> User {
    match harness.onboarding.register_user(email(address), "hash").await {
        Ok(user) => user,
        Err(error) => panic!("registration should succeed: {error}"),
    }
}

async fn provision(harness: &Harness, owner: &User) -> Tenant {
    let result = harness
        .onboarding
        .provision_tenant(owner.id(), "Mitra Jaya Group", "mitra-jaya")
        .await;
    match result {
        Ok((tenant, _)) => tenant,
        Err(error) => panic!("provisioning should succeed: {error}"),
    }
}

async fn create_company(harness: &Harness, owner: &User, tenant: &Tenant, name: &str) -> Company {
    let result = harness
        .onboarding
        .create_company(owner.id(), tenant.id(), name, LegalEntityType::Pt)
        .await;
    match result {
        Ok(company) => company,
        Err(error) => panic!("company creation should succeed: {error}"),
    }
}

#[tokio::test]
async fn onboarding_grant_and_resolution_flow() {
    let harness = harness();
    let owner = register(&harness, "owner@example.com").await;
    let clerk = register(&harness, "clerk@example.com").await;
    let tenant = provision(&harness, &owner).await;
    let jakarta = create_company(&harness, &owner, &tenant, "PT Sumber Rejeki").await;
    let surabaya = create_company(&harness, &owner, &tenant, "PT Cahaya Timur").await;

    let grant = harness
        .grant_admin
        .grant_company_role(
            owner.id(),
            clerk.id(),
            jakarta.id(),
            GrantRole::Company(CompanyRole::Staff),
        )
        .await;
    assert!(grant.is_ok());

    // The clerk sees only the granted company; the owner sees every
    // company in the tenant through the tenant grant.
    let decision = match harness.access.resolve_access(clerk.id(), jakarta.id()).await {
        Ok(decision) => decision,
        Err(error) => panic!("resolution should succeed: {error}"),
    };
    assert!(decision.is_allowed());
    assert_eq!(decision.tier(), Some(GrantTier::Company));

    let sibling = match harness.access.resolve_access(clerk.id(), surabaya.id()).await {
        Ok(decision) => decision,
        Err(error) => panic!("resolution should succeed: {error}"),
    };
    assert!(!sibling.is_allowed());

    let owner_decision = match harness.access.resolve_access(owner.id(), surabaya.id()).await {
        Ok(decision) => decision,
        Err(error) => panic!("resolution should succeed: {error}"),
    };
    assert_eq!(owner_decision.tier(), Some(GrantTier::Tenant));

    // The predicate agrees with per-company resolution.
    let clerk_scope = harness.access.scope_predicate(clerk.id()).await;
    assert!(clerk_scope.contains(jakarta.id()));
    assert!(!clerk_scope.contains(surabaya.id()));

    let owner_scope = harness.access.scope_predicate(owner.id()).await;
    assert!(owner_scope.contains(jakarta.id()));
    assert!(owner_scope.contains(surabaya.id()));
}

#[tokio::test]
async fn concurrent_duplicate_grants_leave_one_active_grant() {
    let harness = harness();
    let owner = register(&harness, "owner@example.com").await;
    let clerk = register(&harness, "clerk@example.com").await;
    let tenant = provision(&harness, &owner).await;
    let company = create_company(&harness, &owner, &tenant, "PT Sumber Rejeki").await;

    let first = tokio::spawn({
        let grant_admin = harness.grant_admin.clone();
        let (owner_id, clerk_id, company_id) = (owner.id(), clerk.id(), company.id());
        async move {
            grant_admin
                .grant_company_role(
                    owner_id,
                    clerk_id,
                    company_id,
                    GrantRole::Company(CompanyRole::Finance),
                )
                .await
        }
    });
    let second = tokio::spawn({
        let grant_admin = harness.grant_admin.clone();
        let (owner_id, clerk_id, company_id) = (owner.id(), clerk.id(), company.id());
        async move {
            grant_admin
                .grant_company_role(
                    owner_id,
                    clerk_id,
                    company_id,
                    GrantRole::Company(CompanyRole::Sales),
                )
                .await
        }
    });

    let outcomes = [
        match first.await {
            Ok(outcome) => outcome,
            Err(error) => panic!("task should not panic: {error}"),
        },
        match second.await {
            Ok(outcome) => outcome,
            Err(error) => panic!("task should not panic: {error}"),
        },
    ];

    let granted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(AppError::DuplicateGrant(_))))
        .count();
    assert_eq!(granted, 1);
    assert_eq!(duplicates, 1);

    let views = match harness
        .grant_admin
        .list_company_grants(owner.id(), company.id())
        .await
    {
        Ok(views) => views,
        Err(error) => panic!("listing should succeed: {error}"),
    };
    assert_eq!(views.iter().filter(|view| view.is_active).count(), 1);
}

#[tokio::test]
async fn revoked_grant_stops_resolving_and_can_be_reissued() {
    let harness = harness();
    let owner = register(&harness, "owner@example.com").await;
    let clerk = register(&harness, "clerk@example.com").await;
    let tenant = provision(&harness, &owner).await;
    let company = create_company(&harness, &owner, &tenant, "PT Sumber Rejeki").await;

    let grant = match harness
        .grant_admin
        .grant_company_role(
            owner.id(),
            clerk.id(),
            company.id(),
            GrantRole::Company(CompanyRole::Staff),
        )
        .await
    {
        Ok(grant) => grant,
        Err(error) => panic!("grant should succeed: {error}"),
    };

    assert!(harness
        .grant_admin
        .revoke_grant(owner.id(), grant.id)
        .await
        .is_ok());

    let decision = match harness.access.resolve_access(clerk.id(), company.id()).await {
        Ok(decision) => decision,
        Err(error) => panic!("resolution should succeed: {error}"),
    };
    assert!(!decision.is_allowed());
    assert!(!harness.access.scope_predicate(clerk.id()).await.contains(company.id()));

    // A fresh grant with a different role is a new row, not an update.
    let regrant = harness
        .grant_admin
        .grant_company_role(
            owner.id(),
            clerk.id(),
            company.id(),
            GrantRole::Company(CompanyRole::Finance),
        )
        .await;
    assert!(regrant.is_ok());

    let views = match harness
        .grant_admin
        .list_company_grants(owner.id(), company.id())
        .await
    {
        Ok(views) => views,
        Err(error) => panic!("listing should succeed: {error}"),
    };
    assert_eq!(views.len(), 2);
    assert_eq!(views.iter().filter(|view| view.is_active).count(), 1);
}

#[tokio::test]
async fn audit_trail_records_every_administrative_action() {
    let harness = harness();
    let owner = register(&harness, "owner@example.com").await;
    let clerk = register(&harness, "clerk@example.com").await;
    let tenant = provision(&harness, &owner).await;
    let company = create_company(&harness, &owner, &tenant, "PT Sumber Rejeki").await;

    let grant = match harness
        .grant_admin
        .grant_company_role(
            owner.id(),
            clerk.id(),
            company.id(),
            GrantRole::Company(CompanyRole::Staff),
        )
        .await
    {
        Ok(grant) => grant,
        Err(error) => panic!("grant should succeed: {error}"),
    };
    assert!(harness
        .grant_admin
        .revoke_grant(owner.id(), grant.id)
        .await
        .is_ok());

    let actions: Vec<&'static str> = harness
        .repository
        .audit_events()
        .await
        .iter()
        .map(|event| event.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec![
            "tenant.provisioned",
            "company.created",
            "grant.created",
            "grant.revoked",
        ]
    );
}
