use std::sync::mpsc::channel;

use daylog::Severity;

fn main() {
    let dir = std::env::temp_dir().join("daylog_demo");
    let _ = std::fs::remove_dir_all(&dir);
    daylog::set_dir(&dir);
    daylog::show_file(false);

    let main_logger = daylog::new("main thread");
    main_logger.info("Hello, world!");

    // worker loggers only print warnings and above, their files get everything
    let (handles, senders): (Vec<_>, Vec<_>) = (0..5)
        .map(|i| {
            let (sender, receiver) = channel::<&'static str>();
            let handle = std::thread::spawn(move || {
                let logger = daylog::new(&format!("thread {i}"));
                logger.set_level(Severity::Warning);
                logger.set_service_name(&format!("worker{i}"));
                for message in receiver {
                    logger.debug(format_args!("received {message}"));
                    logger.warn(format_args!("MESSAGE RECEIVED: {message}"));
                }
            });
            (handle, sender)
        })
        .unzip();
    for sender in senders {
        sender.send("Hello, world!").unwrap();
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let mut files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .collect();
    files.sort();
    for path in files {
        let content = std::fs::read_to_string(&path).unwrap();
        main_logger.info(format_args!(
            "{} holds {} lines",
            path.file_name().unwrap().to_string_lossy(),
            content.lines().count()
        ));
    }
    daylog::close_all();
}
