use std::{
    io::{self, BufRead, Write},
    path::Path,
};

use colored::Colorize;

use crate::{
    cli::App,
    router::{LOGIN_PATH, REDIRECT_QUERY_KEY, with_query},
    success,
    types::{
        AvatarUpload, ChangePasswordData, LoginCredentials, RegisterData, UpdateProfileData, User,
    },
    utils, warning,
};

pub async fn login(app: &mut App, email: String, password: Option<String>, redirect: Option<String>) {
    let query: Vec<(String, String)> = redirect
        .map(|path| (REDIRECT_QUERY_KEY.to_string(), path))
        .into_iter()
        .collect();
    let location = with_query(LOGIN_PATH, &query);
    if !app.open(&location) {
        return;
    }

    let credentials = LoginCredentials {
        email,
        password: password.unwrap_or_else(|| read_secret("Password")),
        remember_me: Some(true),
    };

    let pb = utils::spinner("Signing in...");
    let result = app.auth.login(&credentials).await;
    pb.finish_and_clear();

    match result {
        Ok(response) => {
            success!("Logged in as {}", response.user.display_name.bold());
            if !response.user.email_verified {
                warning!("Your email address is not verified yet.");
            }
        }
        Err(e) => app.fail("Login failed", e),
    }
}

pub async fn register(app: &mut App, email: String, display_name: String, password: Option<String>) {
    if !app.open("/auth/register") {
        return;
    }

    let password = password.unwrap_or_else(|| read_secret("Password"));
    let data = RegisterData {
        email,
        confirm_password: password.clone(),
        password,
        display_name,
    };

    let pb = utils::spinner("Creating account...");
    let result = app.auth.register(&data).await;
    pb.finish_and_clear();

    match result {
        Ok(response) => {
            success!("Welcome, {}!", response.user.display_name.bold());
            crate::info!("Check {} for a verification link.", response.user.email);
        }
        Err(e) => app.fail("Registration failed", e),
    }
}

pub async fn logout(app: &mut App) {
    if !app.auth.is_authenticated() {
        warning!("Not logged in.");
        return;
    }

    app.auth.logout().await;
    app.open("/");
    success!("Logged out");
}

pub async fn whoami(app: &mut App) {
    if !app.open("/profile/overview") {
        app.report_session();
        return;
    }

    match app.auth.user() {
        Some(user) => print_user(&user),
        None => warning!("Not logged in."),
    }
}

pub async fn update_profile(
    app: &mut App,
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
) {
    if !app.open("/profile/settings") {
        return;
    }

    let data = UpdateProfileData {
        display_name,
        bio,
        avatar_url,
    };
    match app.auth.update_profile(&data).await {
        Ok(user) => {
            success!("Profile updated");
            print_user(&user);
        }
        Err(e) => app.fail("Cannot update profile", e),
    }
}

pub async fn change_password(app: &mut App, current: Option<String>, new: Option<String>) {
    if !app.open("/profile/settings") {
        return;
    }

    let current_password = current.unwrap_or_else(|| read_secret("Current password"));
    let new_password = new.unwrap_or_else(|| read_secret("New password"));
    let data = ChangePasswordData {
        current_password,
        confirm_password: new_password.clone(),
        new_password,
    };

    match app.auth.change_password(&data).await {
        Ok(()) => success!("Password changed"),
        Err(e) => app.fail("Cannot change password", e),
    }
}

pub async fn upload_avatar(app: &mut App, file: &Path) {
    if !app.open("/profile/settings") {
        return;
    }

    let bytes = match async_fs::read(file).await {
        Ok(bytes) => bytes,
        Err(e) => crate::error!("Cannot read {}: {}", file.display(), e),
    };
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "avatar".to_string());
    let upload = AvatarUpload {
        mime_type: utils::image_mime_type(&file_name).to_string(),
        file_name,
        bytes,
    };

    let pb = utils::spinner("Uploading avatar...");
    let result = app.auth.upload_avatar(&upload).await;
    pb.finish_and_clear();

    match result {
        Ok(response) => success!("Avatar updated: {}", response.avatar_url),
        Err(e) => app.fail("Cannot upload avatar", e),
    }
}

pub async fn delete_account(app: &mut App, password: Option<String>) {
    if !app.open("/profile/settings") {
        return;
    }

    let password = password.unwrap_or_else(|| read_secret("Password"));
    match app.auth.delete_account(&password).await {
        Ok(()) => success!("Account deleted"),
        Err(e) => app.fail("Cannot delete account", e),
    }
}

pub async fn verify_email(app: &mut App, token: String) {
    if !app.open(&with_token("/auth/verify-email", &token)) {
        return;
    }

    match app.auth.verify_email(&token).await {
        Ok(()) => success!("Email address verified"),
        Err(e) => app.fail("Verification failed", e),
    }
}

pub async fn resend_verification(app: &mut App) {
    if !app.open("/profile/settings") {
        return;
    }

    match app.auth.resend_verification_email().await {
        Ok(()) => success!("Verification email sent"),
        Err(e) => app.fail("Cannot send verification email", e),
    }
}

pub async fn forgot_password(app: &mut App, email: String) {
    if !app.open("/auth/forgot-password") {
        return;
    }

    match app.auth.forgot_password(&email).await {
        Ok(()) => success!("If {} has an account, a reset link is on its way.", email),
        Err(e) => app.fail("Cannot request password reset", e),
    }
}

pub async fn reset_password(app: &mut App, token: String, password: Option<String>) {
    if !app.open(&with_token("/auth/reset-password", &token)) {
        return;
    }

    let password = password.unwrap_or_else(|| read_secret("New password"));
    match app.auth.reset_password(&token, &password).await {
        Ok(()) => success!("Password reset. You can log in now."),
        Err(e) => app.fail("Cannot reset password", e),
    }
}

fn with_token(path: &str, token: &str) -> String {
    with_query(path, &[("token".to_string(), token.to_string())])
}

fn print_user(user: &User) {
    println!("{}", user.display_name.bold());
    println!("  email:    {}", user.email);
    println!(
        "  verified: {}",
        if user.email_verified {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    if let Some(bio) = &user.bio {
        println!("  bio:      {}", bio);
    }
    if let Some(avatar) = &user.avatar_url {
        println!("  avatar:   {}", avatar);
    }
    println!("  joined:   {}", user.created_at.chars().take(10).collect::<String>());
}

/// Reads one line from stdin after printing `prompt`.
fn read_secret(prompt: &str) -> String {
    print!("{prompt}: ");
    if let Err(e) = io::stdout().flush() {
        tracing::debug!(error = %e, "cannot flush prompt");
    }

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        crate::error!("Cannot read {}: {}", prompt.to_lowercase(), e);
    }
    line.trim_end_matches(['\r', '\n']).to_string()
}
