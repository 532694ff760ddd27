use super::*;

pub(super) async fn handle_login(shell: &Shell, args: LoginArgs) -> anyhow::Result<()> {
    match shell.auth.login(&args.email, &args.password).await {
        Ok(change) => {
            let user = shell.session.user().unwrap_or_default();
            println!("Logged in as {}", user.display_name());
            shell.record_ok(
                AuditEvent::SessionLogin,
                json!({ "method": "password", "change": format!("{change:?}") }),
            );
            Ok(())
        }
        Err(err) => {
            shell.record_failure(AuditEvent::SessionLogin, &err);
            Err(err.into())
        }
    }
}

pub(super) async fn handle_signup(shell: &Shell, args: SignupArgs) -> anyhow::Result<()> {
    let created = shell
        .auth
        .signup(&args.name, &args.email, &args.password)
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::SessionSignup, err))?;
    println!("Account created for {}", created.display_name());
    shell.record_ok(AuditEvent::SessionSignup, json!({ "user_id": created.id }));
    Ok(())
}

pub(super) async fn handle_forgot_password(shell: &Shell, args: EmailArgs) -> anyhow::Result<()> {
    let message = shell
        .auth
        .forgot_password(&args.email)
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::RecoveryRequest, err))?;
    println!("{message}");
    shell.record_ok(AuditEvent::RecoveryRequest, json!({}));
    Ok(())
}

pub(super) async fn handle_verify_otp(shell: &Shell, args: VerifyOtpArgs) -> anyhow::Result<()> {
    let message = shell
        .auth
        .verify_otp(&args.email, &args.otp)
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::RecoveryVerify, err))?;
    println!("{message}");
    shell.record_ok(AuditEvent::RecoveryVerify, json!({}));
    Ok(())
}

pub(super) async fn handle_reset_password(
    shell: &Shell,
    args: ResetPasswordArgs,
) -> anyhow::Result<()> {
    let message = shell
        .auth
        .reset_password(&args.email, &args.otp, &args.password, &args.confirm)
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::RecoveryReset, err))?;
    println!("{message}");
    shell.record_ok(AuditEvent::RecoveryReset, json!({}));
    Ok(())
}

pub(super) async fn handle_whoami(shell: &Shell) -> anyhow::Result<()> {
    if !shell.session.snapshot().is_authenticated() {
        println!("Not logged in");
        println!("{}", route_hint(&Route::Login));
        return Ok(());
    }
    let profile = shell
        .auth
        .fetch_profile()
        .await
        .inspect_err(|err| shell.record_failure(AuditEvent::SessionProfile, err))?;
    println!("{}", profile.display_name());
    if let Some(email) = profile.email.as_deref() {
        println!("{email}");
    }
    Ok(())
}

pub(super) fn handle_logout(shell: &Shell) -> anyhow::Result<()> {
    let was_authenticated = shell.session.snapshot().is_authenticated();
    shell.auth.logout();
    println!("Logged out");
    shell.record_ok(
        AuditEvent::SessionLogout,
        json!({ "had_session": was_authenticated }),
    );
    Ok(())
}
