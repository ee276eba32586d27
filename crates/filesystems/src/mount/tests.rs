use super::*;
use convergence::testing::{FakeFileSystem, FakeShell, FsWrite};
use convergence::{
    ActionOutcome, Config, NoEvents, NodeFacts, ProviderRegistry, System, run_action,
};
use std::path::PathBuf;

const FSTAB: &str = "\
# /etc/fstab: static file system information.
/dev/sda1 / ext4 errors=remount-ro 0 1
/dev/sdb1 /mnt/data ext4 defaults 0 2
";

fn data_mount(options: Option<&str>) -> Resource {
    let mut r = Resource::new(resource_type().unwrap(), "/mnt/data");
    r.set("device", "/dev/sdb1").unwrap();
    r.set("fstype", "ext4").unwrap();
    if let Some(options) = options {
        r.set("options", options).unwrap();
    }
    r
}

fn run<F: MountFlavor>(
    fs: &FakeFileSystem,
    shell: &FakeShell,
    resource: &Resource,
    action: &str,
    why_run: bool,
) -> Result<ActionOutcome> {
    let node = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
    let config = Config::default();
    let ctx = ProviderContext {
        new_resource: resource,
        system: System::new(shell, fs),
        node: &node,
        config: &config,
        why_run,
    };
    run_action(&mut MountProvider::<F>::new(), action, &ctx, &mut NoEvents)
}

fn machine() -> FakeFileSystem {
    FakeFileSystem::new()
        .with_file("/etc/fstab", FSTAB)
        .with_file("/dev/sdb1", "")
        .with_dir("/mnt/data")
}

#[test]
fn test_resource_defaults() {
    let r = data_mount(None);
    let spec = MountSpec::from_resource(&r).unwrap();
    assert_eq!(spec.options, vec!["defaults".to_string()]);
    assert_eq!(spec.pass, 2);
    assert_eq!(spec.device_type, DeviceType::Device);
    assert!(!spec.supports_remount);
}

#[test]
fn test_device_trailing_slash_trimmed() {
    let mut r = data_mount(None);
    r.set("device", "/dev/sdb1/").unwrap();
    assert_eq!(r.get_string("device").unwrap().as_deref(), Some("/dev/sdb1"));
    r.set("device", "nas:/").unwrap();
    assert_eq!(r.get_string("device").unwrap().as_deref(), Some("nas:/"));
}

#[test]
fn test_device_type_validated() {
    let mut r = data_mount(None);
    assert!(r.set("device_type", "label").is_ok());
    let err = r.set("device_type", "partuuid").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn test_enable_unchanged_does_not_rewrite() {
    let fs = machine();
    let shell = FakeShell::new();
    let outcome = run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "enable", false)
        .unwrap();
    assert!(!outcome.updated);
    assert!(fs.writes().is_empty());
}

#[test]
fn test_enable_changed_options_disables_once_then_appends_once() {
    let fs = machine();
    let shell = FakeShell::new();
    let outcome = run::<MountOutputFlavor>(
        &fs,
        &shell,
        &data_mount(Some("defaults,noatime")),
        "enable",
        false,
    )
    .unwrap();
    assert!(outcome.updated);
    let fstab = PathBuf::from("/etc/fstab");
    assert_eq!(
        fs.writes(),
        vec![FsWrite::Write(fstab.clone()), FsWrite::Write(fstab)]
    );
    let contents = fs.contents("/etc/fstab").unwrap();
    assert_eq!(contents.matches("/mnt/data").count(), 1);
    assert!(contents.ends_with("/dev/sdb1 /mnt/data ext4 defaults,noatime 0 2\n"));
    assert!(contents.starts_with("# /etc/fstab"));
}

#[test]
fn test_enable_appends_when_absent() {
    let fs = FakeFileSystem::new()
        .with_file("/etc/fstab", "/dev/sda1 / ext4 defaults 0 1")
        .with_dir("/mnt/data");
    let shell = FakeShell::new();
    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "enable", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(
        fs.contents("/etc/fstab").unwrap(),
        "/dev/sda1 / ext4 defaults 0 1\n/dev/sdb1 /mnt/data ext4 defaults 0 2\n"
    );
    let again = run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "enable", false)
        .unwrap();
    assert!(!again.updated);
}

#[test]
fn test_enable_whyrun_leaves_fstab() {
    let fs = machine();
    let shell = FakeShell::new();
    let outcome = run::<MountOutputFlavor>(
        &fs,
        &shell,
        &data_mount(Some("noatime")),
        "enable",
        true,
    )
    .unwrap();
    assert!(outcome.updated);
    assert!(fs.writes().is_empty());
    assert_eq!(fs.contents("/etc/fstab").unwrap(), FSTAB);
}

#[test]
fn test_disable_removes_last_matching_line() {
    let fs = FakeFileSystem::new().with_file(
        "/etc/fstab",
        "/dev/sdb1 /mnt/data ext4 ro 0 2\n/dev/sdb1 /mnt/data ext4 defaults 0 2\n",
    );
    let shell = FakeShell::new();
    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "disable", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(
        fs.contents("/etc/fstab").unwrap(),
        "/dev/sdb1 /mnt/data ext4 ro 0 2\n"
    );
}

#[test]
fn test_disable_when_absent_is_noop() {
    let fs = FakeFileSystem::new().with_file("/etc/fstab", "");
    let shell = FakeShell::new();
    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "disable", false).unwrap();
    assert!(!outcome.updated);
}

#[test]
fn test_mount_runs_mount_command() {
    let fs = machine();
    let shell = FakeShell::new().with_stdout("mount", "/dev/sda1 on / type ext4 (rw)\n");
    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "mount", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(
        shell.calls(),
        vec![
            "mount".to_string(),
            "mount -t ext4 -o defaults /dev/sdb1 /mnt/data".to_string()
        ]
    );
}

#[test]
fn test_mount_when_mounted_is_noop() {
    let fs = machine();
    let shell =
        FakeShell::new().with_stdout("mount", "/dev/sdb1 on /mnt/data type ext4 (rw)\n");
    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "mount", false).unwrap();
    assert!(!outcome.updated);
    assert_eq!(shell.calls(), vec!["mount".to_string()]);
}

#[test]
fn test_mount_missing_device() {
    let fs = FakeFileSystem::new()
        .with_file("/etc/fstab", "")
        .with_dir("/mnt/data");
    let shell = FakeShell::new();
    let err = run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "mount", false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert!(err.to_string().contains("Device /dev/sdb1 does not exist"));

    let outcome =
        run::<MountOutputFlavor>(&fs, &shell, &data_mount(None), "mount", true).unwrap();
    assert!(outcome.updated);
    assert_eq!(
        outcome.assumptions,
        vec!["Assuming device /dev/sdb1 would have been created".to_string()]
    );
    assert!(shell.calls().iter().all(|c| c == "mount"));
}

#[test]
fn test_network_device_need_not_exist() {
    let fs = FakeFileSystem::new()
        .with_file("/etc/fstab", "")
        .with_dir("/mnt/data");
    let shell = FakeShell::new();
    let mut r = data_mount(None);
    r.set("device", "nas:/export/data").unwrap();
    r.set("fstype", "nfs").unwrap();
    let outcome = run::<MountOutputFlavor>(&fs, &shell, &r, "mount", false).unwrap();
    assert!(outcome.updated);
}

#[test]
fn test_label_device() {
    let fs = machine().with_file("/dev/sdc1", "");
    let shell = FakeShell::new().with_stdout("findfs LABEL=data", "/dev/sdc1\n");
    let mut r = data_mount(None);
    r.set("device", "data").unwrap();
    r.set("device_type", "label").unwrap();
    run::<MountOutputFlavor>(&fs, &shell, &r, "mount", false).unwrap();
    assert_eq!(
        shell.calls().last().unwrap(),
        "mount -t ext4 -o defaults -L data /mnt/data"
    );
}

#[test]
fn test_remount_skipped_when_options_live() {
    let fs = machine();
    let shell = FakeShell::new().with_stdout(
        "mount",
        "/dev/sdb1 on /mnt/data type ext4 (rw,noatime)\n",
    );
    let outcome = run::<MountOutputFlavor>(
        &fs,
        &shell,
        &data_mount(Some("noatime")),
        "remount",
        false,
    )
    .unwrap();
    assert!(!outcome.updated);
    assert_eq!(shell.calls(), vec!["mount".to_string()]);
}

#[test]
fn test_remount_with_support() {
    let fs = machine();
    let shell =
        FakeShell::new().with_stdout("mount", "/dev/sdb1 on /mnt/data type ext4 (rw)\n");
    let mut r = data_mount(Some("ro"));
    let mut supports = BTreeMap::new();
    supports.insert("remount".to_string(), Value::Bool(true));
    r.set("supports", Value::Map(supports)).unwrap();
    let outcome = run::<MountOutputFlavor>(&fs, &shell, &r, "remount", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(shell.calls().last().unwrap(), "mount -o remount,ro /mnt/data");
}

#[test]
fn test_remount_without_support_cycles() {
    let fs = machine();
    let shell =
        FakeShell::new().with_stdout("mount", "/dev/sdb1 on /mnt/data type ext4 (rw)\n");
    run::<MountOutputFlavor>(&fs, &shell, &data_mount(Some("ro")), "remount", false).unwrap();
    assert_eq!(
        shell.calls()[1..],
        [
            "umount /mnt/data".to_string(),
            "mount -t ext4 -o ro /dev/sdb1 /mnt/data".to_string()
        ]
    );
}

#[test]
fn test_linux_findmnt_probe() {
    let fs = machine();
    let shell = FakeShell::new().with_stdout(
        "findmnt -rn --target /mnt/data",
        "/mnt/data /dev/sdb1 ext4 rw,relatime\n",
    );
    let outcome =
        run::<FindmntFlavor>(&fs, &shell, &data_mount(None), "mount", false).unwrap();
    assert!(!outcome.updated);

    let outcome =
        run::<FindmntFlavor>(&fs, &shell, &data_mount(None), "umount", false).unwrap();
    assert!(outcome.updated);
    assert_eq!(shell.calls().last().unwrap(), "umount /mnt/data");
}

#[test]
fn test_linux_findmnt_not_mounted() {
    let fs = machine();
    let shell = FakeShell::new().with_failure("findmnt -rn --target /mnt/data", 1, "");
    let outcome =
        run::<FindmntFlavor>(&fs, &shell, &data_mount(None), "umount", false).unwrap();
    assert!(!outcome.updated);
}

#[test]
fn test_solaris_enable_and_mount() {
    let fs = FakeFileSystem::new()
        .with_file("/etc/vfstab", "#device\tdevice\tmount\n")
        .with_file("/dev/dsk/c0t1d0s0", "")
        .with_dir("/export");
    let shell = FakeShell::new();
    let mut r = Resource::new(resource_type().unwrap(), "/export");
    r.set("device", "/dev/dsk/c0t1d0s0").unwrap();
    r.set("fstype", "ufs").unwrap();
    r.set("options", "logging").unwrap();

    let outcome = run::<SolarisFlavor>(&fs, &shell, &r, "enable", false).unwrap();
    assert!(outcome.updated);
    assert!(fs
        .contents("/etc/vfstab")
        .unwrap()
        .ends_with("/dev/dsk/c0t1d0s0\t-\t/export\tufs\t2\tyes\tlogging\n"));
    assert!(!run::<SolarisFlavor>(&fs, &shell, &r, "enable", false).unwrap().updated);

    run::<SolarisFlavor>(&fs, &shell, &r, "mount", false).unwrap();
    assert_eq!(
        shell.calls(),
        vec![
            "mount -v".to_string(),
            "mount -v".to_string(),
            "mount -v".to_string(),
            "mount -F ufs -o logging /dev/dsk/c0t1d0s0 /export".to_string(),
        ]
    );
}

#[test]
fn test_solaris_enable_is_idempotent_for_boot_options() {
    for options in ["noauto,logging", "defaults,logging", "logging,noauto,defaults"] {
        let fs = FakeFileSystem::new()
            .with_file("/etc/vfstab", "")
            .with_file("/dev/dsk/c0t1d0s0", "")
            .with_dir("/export");
        let shell = FakeShell::new();
        let mut r = Resource::new(resource_type().unwrap(), "/export");
        r.set("device", "/dev/dsk/c0t1d0s0").unwrap();
        r.set("fstype", "ufs").unwrap();
        r.set("options", options).unwrap();

        let first = run::<SolarisFlavor>(&fs, &shell, &r, "enable", false).unwrap();
        assert!(first.updated, "{options}");
        let written = fs.contents("/etc/vfstab").unwrap();
        let second = run::<SolarisFlavor>(&fs, &shell, &r, "enable", false).unwrap();
        assert!(!second.updated, "{options}: {written}");
        assert_eq!(fs.contents("/etc/vfstab").unwrap(), written);
    }
}

#[test]
fn test_solaris_rejects_labels() {
    let fs = FakeFileSystem::new().with_file("/etc/vfstab", "");
    let shell = FakeShell::new();
    let mut r = data_mount(None);
    r.set("device", "data").unwrap();
    r.set("device_type", "label").unwrap();
    let err = run::<SolarisFlavor>(&fs, &shell, &r, "enable", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_registration_by_os() {
    let mut registry = ProviderRegistry::new();
    register(&mut registry).unwrap();
    let linux = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
    let bsd = NodeFacts::for_os("freebsd", "14.1");
    let solaris = NodeFacts::for_os("solaris", "11.4");
    assert_eq!(registry.resolve("mount", &linux).unwrap().provider, "mount::linux");
    assert_eq!(registry.resolve("mount", &bsd).unwrap().provider, "mount::mount");
    assert_eq!(
        registry.resolve("mount", &solaris).unwrap().provider,
        "mount::solaris"
    );
}
