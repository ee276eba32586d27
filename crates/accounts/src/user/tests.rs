use super::*;
use convergence::testing::{FakeFileSystem, FakeShell};
use convergence::{ActionOutcome, Config, NoEvents, NodeFacts, System, run_action};

const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
adam:x:1000:1000:Adam Jacob:/home/adam:/usr/bin/zsh
";

const SHADOW: &str = "\
root:*:19000:0:99999:7:::
adam:$6$salt$hash:19000:0:99999:7:::
";

const GROUP: &str = "\
staff:x:23:
adam:x:1000:
";

fn fedora() -> NodeFacts {
    NodeFacts::new("fedora", "fedora", "linux", "40")
}

fn machine() -> FakeFileSystem {
    FakeFileSystem::new()
        .with_file("/etc/passwd", PASSWD)
        .with_file("/etc/shadow", SHADOW)
        .with_file("/etc/group", GROUP)
}

fn user(name: &str) -> Resource {
    Resource::new(resource_type().unwrap(), name)
}

/// `adam` exactly as the fixture files describe him.
fn adam() -> Resource {
    let mut r = user("adam");
    r.set("comment", "Adam Jacob").unwrap();
    r.set("uid", 1000).unwrap();
    r.set("gid", "adam").unwrap();
    r.set("home", "/home/adam/").unwrap();
    r.set("shell", "/usr/bin/zsh").unwrap();
    r.set("password", "$6$salt$hash").unwrap();
    r
}

fn run<S: UserStrategy>(
    fs: &FakeFileSystem,
    shell: &FakeShell,
    node: &NodeFacts,
    resource: &Resource,
    action: &str,
    why_run: bool,
) -> Result<ActionOutcome> {
    let config = Config::default();
    let ctx = ProviderContext {
        new_resource: resource,
        system: System::new(shell, fs),
        node,
        config: &config,
        why_run,
    };
    run_action(&mut UserProvider::<S>::new(), action, &ctx, &mut NoEvents)
}

fn current_adam() -> CurrentUser {
    CurrentUser {
        uid: "1000".to_string(),
        gid: "1000".to_string(),
        comment: "Adam Jacob".to_string(),
        home: "/home/adam".to_string(),
        shell: "/usr/bin/zsh".to_string(),
        password: Some("$6$salt$hash".to_string()),
        expire_date: None,
        inactive: None,
    }
}

fn new_user_spec() -> UserSpec {
    UserSpec {
        name: "adam".to_string(),
        comment: Some("Adam Jacob".to_string()),
        uid: Some("1000".to_string()),
        gid: Some("23".to_string()),
        home: Some("/Users/mud".to_string()),
        shell: Some("/usr/bin/zsh".to_string()),
        password: Some("abracadabra".to_string()),
        manage_home: true,
        ..UserSpec::default()
    }
}

fn diff<'a>(spec: &'a UserSpec, current: Option<&'a CurrentUser>) -> UserDiff<'a> {
    UserDiff {
        spec,
        current,
        desired_gid: spec.gid.as_deref(),
        linux: true,
    }
}

// ----------------------------------------------------------------------------
// Resource
// ----------------------------------------------------------------------------

#[test]
fn test_expire_date_format_validated() {
    let mut r = user("adam");
    assert!(r.set("expire_date", "2030-01-31").is_ok());
    let err = r.set("expire_date", "2030/01/31").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(r.get_string("expire_date").unwrap().as_deref(), Some("2030-01-31"));
}

#[test]
fn test_flags_default_false() {
    let spec = UserSpec::from_resource(&user("adam")).unwrap();
    assert!(!spec.manage_home && !spec.non_unique && !spec.system && !spec.force);
    assert_eq!(spec.name, "adam");
    assert_eq!(spec.inactive, None);
}

#[test]
fn test_inactive_is_integer() {
    let mut r = user("adam");
    assert!(r.set("inactive", 30).is_ok());
    assert!(r.set("inactive", "30").is_err());
}

// ----------------------------------------------------------------------------
// Paths and comparison
// ----------------------------------------------------------------------------

#[test]
fn test_clean_path() {
    assert_eq!(clean_path("/home/adam/"), "/home/adam");
    assert_eq!(clean_path("/home/adam/."), "/home/adam");
    assert_eq!(clean_path("/home//adam"), "/home/adam");
    assert_eq!(clean_path("/home/./adam"), "/home/adam");
    assert_eq!(clean_path("/home/mud/../adam"), "/home/adam");
    assert_eq!(clean_path("/"), "/");
    assert_eq!(clean_path("/.."), "/");
    assert_eq!(clean_path("a/./b/"), "a/b");
    assert_eq!(clean_path(""), ".");
}

#[test]
fn test_updating_home() {
    let current = current_adam();
    let mut spec = UserSpec {
        name: "adam".to_string(),
        ..UserSpec::default()
    };
    assert!(!diff(&spec, Some(&current)).updating_home());

    for same in ["/home/adam", "/home/adam/", "/home/adam/.", "/home//adam"] {
        spec.home = Some(same.to_string());
        assert!(!diff(&spec, Some(&current)).updating_home(), "{same}");
    }

    spec.home = Some("/home/mud".to_string());
    assert!(diff(&spec, Some(&current)).updating_home());
    assert!(diff(&spec, None).updating_home());
}

#[test]
fn test_compare_user_unchanged() {
    let current = current_adam();
    let spec = UserSpec {
        name: "adam".to_string(),
        comment: Some("Adam Jacob".to_string()),
        uid: Some("1000".to_string()),
        gid: Some("1000".to_string()),
        home: Some("/home/adam/".to_string()),
        ..UserSpec::default()
    };
    assert!(compare_user(&diff(&spec, Some(&current))).is_empty());
}

#[test]
fn test_compare_user_descriptions() {
    let current = current_adam();
    let spec = UserSpec {
        name: "adam".to_string(),
        comment: Some("Adam".to_string()),
        home: Some("/home/mud".to_string()),
        password: Some("secret".to_string()),
        gid: Some("staff".to_string()),
        ..UserSpec::default()
    };
    let d = UserDiff {
        desired_gid: Some("23"),
        ..diff(&spec, Some(&current))
    };
    assert_eq!(
        compare_user(&d),
        vec![
            "change homedir from /home/adam to /home/mud",
            "change comment from Adam Jacob to Adam",
            "change password from ******** to ********",
            "change gid from 1000 to 23",
        ]
    );
}

#[test]
fn test_compare_shadow_dates_only_on_linux() {
    let current = current_adam();
    let spec = UserSpec {
        name: "adam".to_string(),
        expire_date: Some("2030-01-31".to_string()),
        inactive: Some("30".to_string()),
        ..UserSpec::default()
    };
    assert_eq!(
        compare_user(&diff(&spec, Some(&current))),
        vec![
            "change expire_date from  to 2030-01-31",
            "change inactive from  to 30",
        ]
    );
    let elsewhere = UserDiff {
        linux: false,
        ..diff(&spec, Some(&current))
    };
    assert!(compare_user(&elsewhere).is_empty());
}

// ----------------------------------------------------------------------------
// useradd options
// ----------------------------------------------------------------------------

#[test]
fn test_useradd_command_option_order() {
    let spec = new_user_spec();
    assert_eq!(
        Useradd::useradd_command(&diff(&spec, None)).to_string(),
        "useradd -c \"Adam Jacob\" -g 23 -p abracadabra -s /usr/bin/zsh -u 1000 -d /Users/mud -m adam"
    );
}

#[test]
fn test_useradd_options() {
    let mut spec = UserSpec {
        name: "svc".to_string(),
        ..UserSpec::default()
    };
    assert_eq!(Useradd::useradd_options(&diff(&spec, None)), vec!["-M"]);
    spec.system = true;
    assert_eq!(Useradd::useradd_options(&diff(&spec, None)), vec!["-r", "-M"]);
    spec.manage_home = true;
    assert_eq!(Useradd::useradd_options(&diff(&spec, None)), vec!["-r", "-m"]);
}

#[test]
fn test_universal_options_skip_unchanged() {
    let current = current_adam();
    let mut spec = new_user_spec();
    spec.comment = Some("Adam Jacob".to_string());
    spec.shell = Some("/bin/bash".to_string());
    spec.password = None;
    spec.home = Some("/home/adam".to_string());
    spec.gid = Some("1000".to_string());
    spec.non_unique = true;
    assert_eq!(
        Useradd::universal_options(&diff(&spec, Some(&current))),
        vec!["-s", "/bin/bash", "-o"]
    );
}

#[test]
fn test_universal_options_shadow_dates() {
    let spec = UserSpec {
        name: "adam".to_string(),
        expire_date: Some("2030-01-31".to_string()),
        inactive: Some("30".to_string()),
        ..UserSpec::default()
    };
    let current = current_adam();
    assert_eq!(
        Useradd::universal_options(&diff(&spec, Some(&current))),
        vec!["-e", "2030-01-31", "-f", "30"]
    );

    let mut current = current_adam();
    current.expire_date = Some("2030-01-31".to_string());
    current.inactive = Some(30);
    assert!(Useradd::universal_options(&diff(&spec, Some(&current))).is_empty());
}

#[test]
fn test_usermod_command() {
    let current = current_adam();
    let mut spec = UserSpec {
        name: "adam".to_string(),
        home: Some("/home/adam/".to_string()),
        manage_home: true,
        ..UserSpec::default()
    };
    assert!(Useradd::usermod_command(&diff(&spec, Some(&current))).is_none());

    spec.home = Some("/home/mud".to_string());
    assert_eq!(
        Useradd::usermod_command(&diff(&spec, Some(&current)))
            .unwrap()
            .to_string(),
        "usermod -d /home/mud -m adam"
    );

    spec.manage_home = false;
    assert_eq!(
        Useradd::usermod_command(&diff(&spec, Some(&current)))
            .unwrap()
            .to_string(),
        "usermod -d /home/mud adam"
    );
}

#[test]
fn test_userdel_command() {
    let mut spec = UserSpec {
        name: "adam".to_string(),
        ..UserSpec::default()
    };
    assert_eq!(Useradd::userdel_command(&spec).to_string(), "userdel adam");
    spec.manage_home = true;
    spec.force = true;
    assert_eq!(Useradd::userdel_command(&spec).to_string(), "userdel -r -f adam");
}

// ----------------------------------------------------------------------------
// Useradd provider
// ----------------------------------------------------------------------------

#[test]
fn test_create_missing_user() {
    let fs = machine();
    let shell = FakeShell::new();
    let mut r = user("bob");
    r.set("gid", "staff").unwrap();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "create", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(outcome.descriptions, vec!["create user bob"]);
    assert_eq!(shell.calls(), vec!["useradd -g staff -M bob"]);
}

#[test]
fn test_create_existing_unchanged_is_idempotent() {
    let fs = machine();
    let shell = FakeShell::new();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &adam(), "create", false).unwrap();
    assert!(!outcome.updated);
    assert!(shell.calls().is_empty());
}

#[test]
fn test_create_existing_alters() {
    let fs = machine();
    let shell = FakeShell::new();
    let mut r = adam();
    r.set("shell", "/bin/bash").unwrap();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "create", false).unwrap();
    assert_eq!(
        outcome.descriptions,
        vec!["alter user adam", "change shell from /usr/bin/zsh to /bin/bash"]
    );
    assert_eq!(shell.calls(), vec!["usermod -s /bin/bash adam"]);
}

#[test]
fn test_manage_and_modify() {
    let fs = machine();
    let mut r = user("bob");
    r.set("shell", "/bin/bash").unwrap();

    let shell = FakeShell::new();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "manage", false).unwrap();
    assert!(!outcome.updated);

    let err = run::<Useradd>(&fs, &shell, &fedora(), &r, "modify", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(err.to_string(), "Cannot modify user bob - does not exist!");

    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "modify", true).unwrap();
    assert_eq!(outcome.assumptions, vec!["Assuming user bob would have been created"]);
    assert!(shell.calls().is_empty());

    let mut r = adam();
    r.set("uid", 1001).unwrap();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "modify", false).unwrap();
    assert_eq!(
        outcome.descriptions,
        vec!["modify user adam", "change uid from 1000 to 1001"]
    );
    assert_eq!(shell.calls(), vec!["usermod -u 1001 adam"]);
}

#[test]
fn test_remove() {
    let fs = machine();
    let shell = FakeShell::new();
    assert!(!run::<Useradd>(&fs, &shell, &fedora(), &user("bob"), "remove", false)
        .unwrap()
        .updated);

    let mut r = user("adam");
    r.set("manage_home", true).unwrap();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "remove", false).unwrap();
    assert_eq!(outcome.descriptions, vec!["remove user adam"]);
    assert_eq!(shell.calls(), vec!["userdel -r adam"]);
}

#[test]
fn test_unresolved_group() {
    let fs = machine();
    let shell = FakeShell::new();
    let mut r = user("bob");
    r.set("gid", "nogroup").unwrap();
    let err = run::<Useradd>(&fs, &shell, &fedora(), &r, "create", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(
        err.to_string(),
        "Couldn't lookup integer GID for group name nogroup"
    );

    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "create", true).unwrap();
    assert!(outcome.assumptions[0].starts_with("group name nogroup does not exist."));
    assert!(shell.calls().is_empty());

    // removal does not need the group
    assert!(run::<Useradd>(&fs, &shell, &fedora(), &r, "remove", false).is_ok());
}

#[test]
fn test_why_run_create_never_mutates() {
    let fs = machine();
    let shell = FakeShell::new();
    let mut r = adam();
    r.set("password", "changed").unwrap();
    r.set("home", "/home/mud").unwrap();
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &r, "create", true).unwrap();
    assert!(outcome.updated);
    assert!(shell.calls().is_empty());
    assert!(fs.writes().is_empty());
}

// ----------------------------------------------------------------------------
// Locking
// ----------------------------------------------------------------------------

#[test]
fn test_useradd_lock_and_unlock() {
    let fs = machine();

    let shell = FakeShell::new()
        .with_stdout("passwd -S adam", "adam P 12/07/2023 0 99999 7 -1\n");
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "lock", false).unwrap();
    assert_eq!(outcome.descriptions, vec!["lock the user adam"]);
    assert_eq!(shell.calls(), vec!["passwd -S adam", "usermod -L adam"]);

    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "unlock", false).unwrap();
    assert!(!outcome.updated);

    let shell = FakeShell::new()
        .with_stdout("passwd -S adam", "adam LK 2023-12-07 0 99999 7 -1 (Password locked.)\n");
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "lock", false).unwrap();
    assert!(!outcome.updated);
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "unlock", false).unwrap();
    assert_eq!(outcome.descriptions, vec!["unlock user adam"]);
    assert_eq!(shell.calls_starting_with("usermod"), vec!["usermod -U adam"]);
}

#[test]
fn test_useradd_lock_status_no_password() {
    let fs = machine();
    let shell = FakeShell::new().with_stdout("passwd -S adam", "adam NP 12/07/2023 0 99999 7 -1\n");
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "unlock", false).unwrap();
    assert!(!outcome.updated);
}

#[test]
fn test_useradd_lock_status_unknown() {
    let fs = machine();
    let shell = FakeShell::new().with_stdout("passwd -S adam", "adam ?? 12/07/2023\n");
    let err = run::<Useradd>(&fs, &shell, &fedora(), &user("adam"), "lock", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalCommandFailed);
    assert!(err.to_string().contains("Cannot determine if user[adam] is locked!"));
}

#[test]
fn test_useradd_lock_missing_user() {
    let fs = machine();
    let shell = FakeShell::new().with_failure(
        "passwd -S bob",
        1,
        "passwd: user 'bob' does not exist",
    );
    let outcome = run::<Useradd>(&fs, &shell, &fedora(), &user("bob"), "lock", true).unwrap();
    assert!(outcome.updated);
    assert_eq!(shell.calls(), vec!["passwd -S bob"]);

    let node = fedora();
    let config = Config::default();
    let r = user("bob");
    let ctx = ProviderContext {
        new_resource: &r,
        system: System::new(&shell, &fs),
        node: &node,
        config: &config,
        why_run: false,
    };
    let spec = UserSpec::from_resource(&r).unwrap();
    let err = Useradd::check_lock(&ctx, &spec, None).unwrap_err();
    assert!(err.to_string().contains("Cannot determine if user[bob] is locked!"));
}

// ----------------------------------------------------------------------------
// Other platforms
// ----------------------------------------------------------------------------

#[test]
fn test_shadow_dates_rejected_off_linux() {
    let fs = machine();
    let shell = FakeShell::new();
    let mut r = adam();
    r.set("inactive", 30).unwrap();
    let solaris = NodeFacts::for_os("solaris", "5.11");
    let err = run::<Solaris>(&fs, &shell, &solaris, &r, "create", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

    let outcome = run::<Solaris>(&fs, &shell, &solaris, &r, "create", true).unwrap();
    assert_eq!(outcome.assumptions.len(), 1);
}

#[test]
fn test_solaris_writes_shadow() {
    let fs = machine();
    let shell = FakeShell::new();
    let solaris = NodeFacts::for_os("solaris", "5.11");
    let mut r = adam();
    r.set("password", "$5$new$hash").unwrap();
    let outcome = run::<Solaris>(&fs, &shell, &solaris, &r, "manage", false).unwrap();
    assert!(outcome.updated);
    assert!(shell.calls().is_empty());
    let shadow = fs.contents("/etc/shadow").unwrap();
    assert!(shadow.contains(&format!("adam:$5$new$hash:{}:0:99999:7:::", Solaris::today())));
    assert!(shadow.starts_with("root:*:19000:"));
}

#[test]
fn test_solaris_create_without_password_flag() {
    let fs = machine();
    let shell = FakeShell::new();
    let solaris = NodeFacts::for_os("solaris", "5.11");
    let mut r = user("bob");
    r.set("password", "$5$x").unwrap();
    r.set("shell", "/bin/ksh").unwrap();
    let err = run::<Solaris>(&fs, &shell, &solaris, &r, "create", false).unwrap_err();
    assert_eq!(shell.calls(), vec!["useradd -s /bin/ksh -M bob"]);
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[test]
fn test_solaris_lock_status() {
    let fs = machine();
    let solaris = NodeFacts::for_os("solaris", "5.11");
    let shell = FakeShell::new().with_stdout("passwd -s adam", "adam      LK    06/20/24\n");
    let outcome = run::<Solaris>(&fs, &shell, &solaris, &user("adam"), "unlock", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(shell.calls(), vec!["passwd -s adam", "passwd -u adam"]);

    let shell = FakeShell::new().with_stdout("passwd -s adam", "adam      PS\n");
    let outcome = run::<Solaris>(&fs, &shell, &solaris, &user("adam"), "lock", false).unwrap();
    assert_eq!(shell.calls(), vec!["passwd -s adam", "passwd -l adam"]);
    assert!(outcome.updated);
}

#[test]
fn test_aix_password_and_lock() {
    let fs = machine();
    let aix = NodeFacts::for_os("aix", "7.2");

    let shell = FakeShell::new();
    let mut r = adam();
    r.set("password", "{ssha256}06$abc").unwrap();
    run::<Aix>(&fs, &shell, &aix, &r, "manage", false).unwrap();
    let calls = shell.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "chpasswd -e");
    assert_eq!(calls[0].stdin.as_deref(), Some("adam:{ssha256}06$abc"));

    let shell = FakeShell::new();
    run::<Aix>(&fs, &shell, &aix, &user("bob"), "create", false).unwrap();
    assert_eq!(shell.calls(), vec!["useradd bob"]);

    let shell = FakeShell::new().with_stdout(
        "lsuser -a account_locked adam",
        "adam account_locked=false\n",
    );
    run::<Aix>(&fs, &shell, &aix, &user("adam"), "lock", false).unwrap();
    assert_eq!(
        shell.calls(),
        vec!["lsuser -a account_locked adam", "chuser account_locked=true adam"]
    );
}

fn freebsd_machine(master: &str) -> FakeFileSystem {
    FakeFileSystem::new()
        .with_file("/etc/passwd", "adam:*:1000:1000:Adam Jacob:/home/adam:/bin/sh\n")
        .with_file("/etc/master.passwd", master)
        .with_file("/etc/group", GROUP)
        .with_file("/usr/sbin/pw", "")
}

#[test]
fn test_pw_create_and_password() {
    let fs = freebsd_machine("adam:$6$old:1000:1000::0:0:Adam Jacob:/home/adam:/bin/sh\n");
    let shell = FakeShell::new();
    let freebsd = NodeFacts::for_os("freebsd", "14.0");
    let mut r = user("bob");
    r.set("comment", "Bob").unwrap();
    r.set("home", "/home/bob").unwrap();
    r.set("manage_home", true).unwrap();
    r.set("password", "$6$bob").unwrap();
    run::<Pw>(&fs, &shell, &freebsd, &r, "create", false).unwrap();
    let calls = shell.invocations();
    assert_eq!(calls[0].command, "pw useradd bob -c Bob -d /home/bob -m");
    assert_eq!(calls[1].command, "pw usermod bob -H 0");
    assert_eq!(calls[1].stdin.as_deref(), Some("$6$bob"));

    let shell = FakeShell::new();
    let mut r = user("adam");
    r.set("password", "$6$old").unwrap();
    r.set("shell", "/bin/sh").unwrap();
    let outcome = run::<Pw>(&fs, &shell, &freebsd, &r, "manage", false).unwrap();
    assert!(!outcome.updated);

    let mut r = user("adam");
    r.set("uid", 1001).unwrap();
    run::<Pw>(&fs, &shell, &freebsd, &r, "manage", false).unwrap();
    assert_eq!(shell.calls(), vec!["pw usermod adam -u 1001"]);
}

#[test]
fn test_pw_lock_from_master_passwd() {
    let freebsd = NodeFacts::for_os("freebsd", "14.0");

    let fs = freebsd_machine("adam:*LOCKED*$6$old:1000:1000::0:0:Adam Jacob:/home/adam:/bin/sh\n");
    let shell = FakeShell::new();
    assert!(!run::<Pw>(&fs, &shell, &freebsd, &user("adam"), "lock", false)
        .unwrap()
        .updated);
    run::<Pw>(&fs, &shell, &freebsd, &user("adam"), "unlock", false).unwrap();
    assert_eq!(shell.calls(), vec!["pw unlock adam"]);

    let fs = freebsd_machine("adam:$6$old:1000:1000::0:0:Adam Jacob:/home/adam:/bin/sh\n");
    let shell = FakeShell::new();
    run::<Pw>(&fs, &shell, &freebsd, &user("adam"), "lock", false).unwrap();
    assert_eq!(shell.calls(), vec!["pw lock adam"]);
}

#[test]
fn test_pw_remove_and_requirement() {
    let freebsd = NodeFacts::for_os("freebsd", "14.0");
    let fs = freebsd_machine("");
    let shell = FakeShell::new();
    let mut r = user("adam");
    r.set("manage_home", true).unwrap();
    run::<Pw>(&fs, &shell, &freebsd, &r, "remove", false).unwrap();
    assert_eq!(shell.calls(), vec!["pw userdel adam -r"]);

    let fs = FakeFileSystem::new().with_file("/etc/passwd", PASSWD);
    let err = run::<Pw>(&fs, &shell, &freebsd, &r, "remove", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingPrerequisite);
}
